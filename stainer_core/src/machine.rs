//! The machine context: I/O, clock, configuration and every piece of state
//! that lives for a whole run.

use std::sync::Arc;

use eyre::WrapErr;
use stainer_traits::{Clock, DigitalIo, PinId, StepCounter};

use crate::builder::MachineBuilder;
use crate::config::MachineCfg;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::induction::InductionState;
use crate::limits::Axis;

/// Completed strokes per axis. Only ever incremented; a new run starts
/// from a new `Machine`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrokeCounters {
    horizontal: u32,
    vertical: u32,
}

impl StrokeCounters {
    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    /// Count one more stroke on `axis` and return the new total.
    pub fn increment(&mut self, axis: Axis) -> u32 {
        let slot = match axis {
            Axis::Horizontal => &mut self.horizontal,
            Axis::Vertical => &mut self.vertical,
        };
        *slot = slot.saturating_add(1);
        *slot
    }
}

pub struct Machine<I: DigitalIo> {
    pub(crate) io: I,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) cfg: MachineCfg,
    pub(crate) counters: StrokeCounters,
    pub(crate) induction: InductionState,
    pub(crate) step_counter: StepCounter,
}

impl<I: DigitalIo> core::fmt::Debug for Machine<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Machine")
            .field("counters", &self.counters)
            .field("induction", &self.induction)
            .field("pulses", &self.step_counter.count())
            .finish()
    }
}

impl<I: DigitalIo> Machine<I> {
    pub fn builder() -> MachineBuilder<I> {
        MachineBuilder::default()
    }

    pub fn config(&self) -> &MachineCfg {
        &self.cfg
    }

    pub fn counters(&self) -> StrokeCounters {
        self.counters
    }

    pub fn step_counter(&self) -> &StepCounter {
        &self.step_counter
    }

    pub(crate) fn read(&mut self, pin: PinId) -> Result<bool> {
        self.io
            .read_pin(pin)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("reading pin {pin}"))
    }

    pub(crate) fn write(&mut self, pin: PinId, high: bool) -> Result<()> {
        self.io
            .write_pin(pin, high)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("writing pin {pin}"))
    }

    pub(crate) fn debounce(&self) {
        self.clock.sleep(self.cfg.timing.debounce);
    }
}
