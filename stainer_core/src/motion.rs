//! Motion profile engine.
//!
//! A move steps toward a direction until that direction's limit switch trips
//! or an optional step budget runs out. Stepper axes ramp the per-phase delay
//! linearly from `max_delay_us` down to `min_delay_us` over `ramp_steps`
//! steps and then cruise. Relay axes run the motor continuously and count
//! pulses on the shared [`StepCounter`](stainer_traits::StepCounter).
//!
//! A bounded move whose last budgeted step lands on the limit ends on the
//! budget: the transition was the full gap.

use eyre::WrapErr;
use stainer_traits::{Clock, DigitalIo, PinId};
use tracing::{debug, trace};

use crate::config::{AxisDrive, DriverPins, MotionProfile};
use crate::error::{FaultReason, Result, fault};
use crate::hw_error::map_hw_error;
use crate::limits::{Direction, LimitSwitch, direction_for, limit_for};
use crate::machine::Machine;
use crate::status::{MoveOutcome, MoveStop};

/// How far a move may go before it stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBudget {
    /// Stop only at the limit switch.
    UntilLimit,
    /// Stop at the limit switch or after this many steps, whichever first.
    AtMost(u32),
}

/// Delay of 1-based step `k`: `M - (M - m) * k / R` during the ramp, `m` after.
#[inline]
pub fn ramp_delay_us(profile: &MotionProfile, k: u32) -> u64 {
    let MotionProfile {
        min_delay_us: m,
        max_delay_us: big_m,
        ramp_steps: r,
    } = *profile;
    if r == 0 || k >= r || big_m <= m {
        return m;
    }
    let span = u128::from(big_m - m);
    let dec = span * u128::from(k) / u128::from(r);
    // dec < span here, so the result lies in (m, M]
    big_m - dec as u64
}

/// Per-step delays of one move, ramp first and cruise forever after.
#[derive(Debug, Clone)]
pub struct Ramp {
    profile: MotionProfile,
    k: u32,
}

impl Ramp {
    pub fn new(profile: MotionProfile) -> Self {
        Self { profile, k: 0 }
    }
}

impl Iterator for Ramp {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.k = self.k.saturating_add(1);
        Some(ramp_delay_us(&self.profile, self.k))
    }
}

/// One step on every driver of an axis.
///
/// DIR is set, STEP goes high, `delay_us` passes, STEP goes low and
/// `delay_us` passes again. Nothing else may run between the phases.
#[inline]
pub fn step_pulse<I: DigitalIo + ?Sized>(
    io: &mut I,
    clock: &(dyn Clock + Send + Sync),
    drivers: &[DriverPins],
    dir_level: bool,
    delay_us: u64,
) -> Result<()> {
    let hw = |e: Box<dyn std::error::Error + Send + Sync>| eyre::Report::new(map_hw_error(&*e));
    for d in drivers {
        io.write_pin(d.dir, dir_level).map_err(hw)?;
    }
    for d in drivers {
        io.write_pin(d.step, true).map_err(hw)?;
    }
    clock.delay_us(delay_us);
    for d in drivers {
        io.write_pin(d.step, false).map_err(hw)?;
    }
    clock.delay_us(delay_us);
    Ok(())
}

impl<I: DigitalIo> Machine<I> {
    /// Drive toward `direction` until its limit switch trips.
    pub fn go_until_limit(&mut self, direction: Direction) -> Result<MoveOutcome> {
        self.move_toward(direction, StepBudget::UntilLimit)
    }

    /// Move toward `direction` within `budget`, stopping early at the limit.
    pub fn move_toward(&mut self, direction: Direction, budget: StepBudget) -> Result<MoveOutcome> {
        let axis = direction.axis();
        let limit = limit_for(direction);
        let drive = self.cfg.axis(axis).drive.clone();
        let outcome = match drive {
            AxisDrive::Stepper {
                drivers,
                enable_active_low,
                profile,
            } => self.stepper_move(
                direction,
                limit,
                budget,
                &drivers,
                enable_active_low,
                profile,
            ),
            AxisDrive::Relay { up, down, poll_us } => {
                self.relay_move(direction, (limit, true), budget, (up, down), poll_us)
            }
        }
        .wrap_err_with(|| format!("moving {direction}"))?;
        debug!(%direction, steps = outcome.steps, stop = ?outcome.stop, "move finished");
        Ok(outcome)
    }

    pub(crate) fn set_drivers_enabled(
        &mut self,
        drivers: &[DriverPins],
        enable_active_low: bool,
        on: bool,
    ) -> Result<()> {
        for d in drivers {
            self.write(d.enable, on != enable_active_low)?;
        }
        Ok(())
    }

    fn stepper_move(
        &mut self,
        direction: Direction,
        limit: LimitSwitch,
        budget: StepBudget,
        drivers: &[DriverPins],
        enable_active_low: bool,
        profile: MotionProfile,
    ) -> Result<MoveOutcome> {
        let dir_level = self.cfg.levels.level(direction);
        self.set_drivers_enabled(drivers, enable_active_low, true)?;

        let mut ramp = Ramp::new(profile);
        let mut steps: u32 = 0;
        let mut last_delay = profile.max_delay_us;
        let stop = loop {
            if let StepBudget::AtMost(n) = budget
                && steps >= n
            {
                break MoveStop::Budget;
            }
            if self.is_pressed(limit)? {
                break MoveStop::Limit;
            }
            let d = ramp.next().unwrap_or(profile.min_delay_us);
            step_pulse(&mut self.io, &*self.clock, drivers, dir_level, d)?;
            last_delay = d;
            steps += 1;
        };

        self.set_drivers_enabled(drivers, enable_active_low, false)?;
        self.clock.sleep(self.cfg.timing.motor_rest);
        self.set_drivers_enabled(drivers, enable_active_low, true)?;
        self.debounce();
        trace!(%direction, steps, last_delay_us = last_delay, "stepper move");
        Ok(MoveOutcome { steps, stop })
    }

    /// Run the relay motor toward `direction` until `watch` reads the given
    /// state or the budget is counted.
    fn relay_move(
        &mut self,
        direction: Direction,
        watch: (LimitSwitch, bool),
        budget: StepBudget,
        (up, down): (PinId, PinId),
        poll_us: Option<u64>,
    ) -> Result<MoveOutcome> {
        let (on, off) = match direction {
            Direction::Up => (up, down),
            _ => (down, up),
        };
        self.write(off, false)?;
        let counter = self.step_counter.clone();
        let start = if let StepBudget::AtMost(_) = budget {
            counter.reset();
            0
        } else {
            counter.count()
        };
        self.write(on, true)?;

        let (switch, pressed) = watch;
        let what = if pressed {
            format!("relay move toward {switch}")
        } else {
            format!("relay move off {switch}")
        };
        let poll_us = poll_us.unwrap_or(self.cfg.timing.poll_us);
        // The motor keeps running between polls, so a pulse and the switch
        // can land together; the counted budget takes precedence.
        let waited = self.wait_until_every(&what, poll_us, |m| {
            let at_switch = m.is_pressed(switch)? == pressed;
            if let StepBudget::AtMost(n) = budget
                && counter.reached(u64::from(n))
            {
                return Ok(Some(MoveStop::Budget));
            }
            Ok(at_switch.then_some(MoveStop::Limit))
        });
        // Relays drop whatever ended the wait.
        let released = self.write(up, false).and_then(|()| self.write(down, false));
        let stop = waited?;
        released?;

        let steps = u32::try_from(counter.count().saturating_sub(start)).unwrap_or(u32::MAX);
        self.debounce();
        trace!(%direction, steps, "relay move");
        Ok(MoveOutcome { steps, stop })
    }

    /// Step away from `switch` until it releases, then debounce.
    ///
    /// A driven stroke leaves the head resting on its endpoint switch. Gives
    /// up with `AlreadyPressed` when the switch still reads pressed after a
    /// full stroke gap.
    pub fn back_off(&mut self, switch: LimitSwitch) -> Result<u32> {
        let away = direction_for(switch).opposite();
        let axis_cfg = self.cfg.axis(away.axis());
        let max = axis_cfg.stroke_gap;
        let steps = match axis_cfg.drive.clone() {
            AxisDrive::Stepper {
                drivers,
                enable_active_low,
                profile,
            } => {
                let dir_level = self.cfg.levels.level(away);
                self.set_drivers_enabled(&drivers, enable_active_low, true)?;
                let mut steps = 0;
                while self.is_pressed(switch)? && steps < max {
                    step_pulse(&mut self.io, &*self.clock, &drivers, dir_level, profile.max_delay_us)?;
                    steps += 1;
                }
                self.debounce();
                steps
            }
            AxisDrive::Relay { up, down, poll_us } => {
                self.relay_move(away, (switch, false), StepBudget::AtMost(max), (up, down), poll_us)?
                    .steps
            }
        };
        if self.is_pressed(switch)? {
            return Err(fault(FaultReason::AlreadyPressed))
                .wrap_err_with(|| format!("{switch} still pressed after backing off {steps} steps"));
        }
        debug!(%switch, steps, "backed off");
        Ok(steps)
    }
}
