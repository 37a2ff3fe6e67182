//! Debounced switch waits.
//!
//! Every wait polls the switch every `timing.poll_us` and, once the wanted
//! state is seen, sleeps the debounce interval before returning. With
//! `safety.switch_wait_ms` set, a wait that runs longer is a fault.

use eyre::WrapErr;
use stainer_traits::DigitalIo;
use tracing::{debug, warn};

use crate::config::Strictness;
use crate::error::{FaultReason, Result, fault};
use crate::limits::LimitSwitch;
use crate::machine::Machine;

impl<I: DigitalIo> Machine<I> {
    /// Read a limit switch, honoring its polarity.
    pub fn is_pressed(&mut self, switch: LimitSwitch) -> Result<bool> {
        let pin = self.cfg.pins.limit(switch);
        let level = self
            .read(pin)
            .wrap_err_with(|| format!("reading {switch} limit"))?;
        Ok(level != self.cfg.pins.limits_active_low)
    }

    /// Poll `probe` every `timing.poll_us` until it yields a value.
    pub(crate) fn wait_until<T>(
        &mut self,
        what: &str,
        probe: impl FnMut(&mut Self) -> Result<Option<T>>,
    ) -> Result<T> {
        let poll_us = self.cfg.timing.poll_us;
        self.wait_until_every(what, poll_us, probe)
    }

    pub(crate) fn wait_until_every<T>(
        &mut self,
        what: &str,
        poll_us: u64,
        mut probe: impl FnMut(&mut Self) -> Result<Option<T>>,
    ) -> Result<T> {
        let started = self.clock.now();
        let limit_ms = self.cfg.safety.switch_wait_ms;
        loop {
            if let Some(v) = probe(self)? {
                return Ok(v);
            }
            if limit_ms > 0 && self.clock.ms_since(started) >= limit_ms {
                warn!(what, limit_ms, "switch wait watchdog expired");
                return Err(fault(FaultReason::WaitTimeout))
                    .wrap_err_with(|| format!("{what} for more than {limit_ms} ms"));
            }
            self.clock.delay_us(poll_us);
        }
    }

    /// Wait for `switch` to read `pressed` and debounce, whatever its
    /// state on entry.
    pub(crate) fn settle(&mut self, switch: LimitSwitch, pressed: bool) -> Result<()> {
        let what = if pressed {
            format!("waiting for {switch} press")
        } else {
            format!("waiting for {switch} release")
        };
        self.wait_until(&what, |m| Ok((m.is_pressed(switch)? == pressed).then_some(())))?;
        self.debounce();
        Ok(())
    }

    fn strict(&self) -> bool {
        self.cfg.run.strictness == Strictness::Strict
    }

    /// Block until `switch` is pressed, then debounce.
    ///
    /// Strict rigs require the switch to be released at call time.
    pub fn wait_press(&mut self, switch: LimitSwitch) -> Result<()> {
        if self.is_pressed(switch)? {
            if self.strict() {
                return Err(fault(FaultReason::AlreadyPressed))
                    .wrap_err_with(|| format!("waiting for {switch} press"));
            }
            debug!(%switch, "already pressed");
        }
        self.settle(switch, true)?;
        debug!(%switch, "pressed");
        Ok(())
    }

    /// Block until `switch` is released, then debounce.
    ///
    /// Strict rigs require the switch to be pressed at call time.
    pub fn wait_release(&mut self, switch: LimitSwitch) -> Result<()> {
        if !self.is_pressed(switch)? {
            if self.strict() {
                return Err(fault(FaultReason::NotPressed))
                    .wrap_err_with(|| format!("waiting for {switch} release"));
            }
            debug!(%switch, "already released");
        }
        self.settle(switch, false)?;
        debug!(%switch, "released");
        Ok(())
    }

    /// Release, press, release: consumes a second tap of a switch that is
    /// currently held.
    pub fn wait_second_release(&mut self, switch: LimitSwitch) -> Result<()> {
        self.settle(switch, false)?;
        self.settle(switch, true)?;
        self.settle(switch, false)?;
        debug!(%switch, "second tap consumed");
        Ok(())
    }

    /// Block until one of `a` and `b` is pressed and return it after debounce.
    ///
    /// Strict: both switches must be released at call time and a
    /// simultaneous press is a fault. Lenient: the first pressed switch in
    /// argument order wins.
    pub fn wait_press_any_of_two(&mut self, a: LimitSwitch, b: LimitSwitch) -> Result<LimitSwitch> {
        let strict = self.strict();
        if strict {
            match (self.is_pressed(a)?, self.is_pressed(b)?) {
                (true, true) => {
                    return Err(fault(FaultReason::BothLimitsPressed))
                        .wrap_err_with(|| format!("{a} and {b} pressed together"));
                }
                (true, false) | (false, true) => {
                    return Err(fault(FaultReason::AlreadyPressed))
                        .wrap_err_with(|| format!("waiting for {a} or {b} press"));
                }
                (false, false) => {}
            }
        }
        let what = format!("waiting for {a} or {b} press");
        let hit = self.wait_until(&what, |m| {
            let pa = m.is_pressed(a)?;
            let pb = m.is_pressed(b)?;
            match (pa, pb) {
                (true, true) if strict => Err(fault(FaultReason::BothLimitsPressed))
                    .wrap_err_with(|| format!("{a} and {b} pressed together")),
                (true, true) => {
                    warn!(%a, %b, "both switches pressed, taking {a}");
                    Ok(Some(a))
                }
                (true, false) => Ok(Some(a)),
                (false, true) => Ok(Some(b)),
                (false, false) => Ok(None),
            }
        })?;
        self.debounce();
        debug!(switch = %hit, "pressed");
        Ok(hit)
    }
}
