//! Induction motor selection and the all-off helpers.

use stainer_traits::DigitalIo;
use tracing::{debug, info};

use crate::config::AxisDrive;
use crate::error::Result;
use crate::limits::Axis;
use crate::machine::Machine;

/// Which induction motor is energized. At most one ever is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InductionState {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl From<Axis> for InductionState {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => InductionState::Horizontal,
            Axis::Vertical => InductionState::Vertical,
        }
    }
}

impl<I: DigitalIo> Machine<I> {
    pub fn induction_state(&self) -> InductionState {
        self.induction
    }

    /// Power down, wait the switch delay, then power the motor of `axis`.
    /// No-op on rigs without induction motors or when already selected.
    pub fn select_induction(&mut self, axis: Axis) -> Result<()> {
        let Some(ind) = self.cfg.induction else {
            return Ok(());
        };
        let want = InductionState::from(axis);
        if self.induction == want {
            return Ok(());
        }
        self.induction_off()?;
        let select = match axis {
            Axis::Horizontal => ind.horizontal_select,
            Axis::Vertical => ind.vertical_select,
        };
        self.write(select, true)?;
        self.write(ind.power, true)?;
        self.induction = want;
        info!(%axis, "induction motor engaged");
        Ok(())
    }

    fn induction_off(&mut self) -> Result<()> {
        let Some(ind) = self.cfg.induction else {
            return Ok(());
        };
        self.write(ind.power, false)?;
        self.write(ind.horizontal_select, false)?;
        self.write(ind.vertical_select, false)?;
        self.clock.sleep(self.cfg.timing.motor_switch_delay);
        self.induction = InductionState::None;
        Ok(())
    }

    /// Induction motors off, relays released and stepper drivers disabled.
    pub fn turn_off_motors(&mut self) -> Result<()> {
        debug!("turning off motors");
        self.induction_off()?;
        for axis in [Axis::Horizontal, Axis::Vertical] {
            match self.cfg.axis(axis).drive.clone() {
                AxisDrive::Stepper {
                    drivers,
                    enable_active_low,
                    ..
                } => self.set_drivers_enabled(&drivers, enable_active_low, false)?,
                AxisDrive::Relay { up, down, .. } => {
                    self.write(up, false)?;
                    self.write(down, false)?;
                }
            }
        }
        Ok(())
    }

    pub fn turn_off_all(&mut self) -> Result<()> {
        debug!("shutting down sprays and motors");
        self.turn_off_motors()?;
        self.turn_off_sprays()
    }
}
