//! Fatal stop and the terminal halt state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stainer_traits::DigitalIo;
use tracing::{error, info, warn};

use crate::induction::InductionState;
use crate::machine::Machine;

/// How long the halt blink lasts. The machine itself never leaves the halt
/// state; the bound only lets a host process or a test get control back.
#[derive(Debug, Clone, Default)]
pub enum BlinkLimit {
    #[default]
    Forever,
    Cycles(u32),
    /// Until the flag is set (e.g. by a Ctrl-C handler).
    UntilFlag(Arc<AtomicBool>),
}

impl<I: DigitalIo> Machine<I> {
    /// Drive every actuator to its safe level. Keeps going past write
    /// failures so one bad pin cannot leave another output energized.
    pub fn force_outputs_off(&mut self) {
        for (pin, level) in self.cfg.safe_outputs() {
            if let Err(e) = self.write(pin, level) {
                warn!(pin, error = %e, "failed to drive output to safe level");
            }
        }
        if self.cfg.induction.is_some() {
            self.clock.sleep(self.cfg.timing.motor_switch_delay);
        }
        self.induction = InductionState::None;
    }

    /// Fatal stop: outputs off, reason logged, then blink the status LED.
    pub fn stop(&mut self, reason: &eyre::Report, blink: &BlinkLimit) {
        self.force_outputs_off();
        error!(reason = %format!("{reason:#}"), "machine stopped");
        self.blink(blink);
    }

    /// Normal end of a run: outputs off, then blink.
    pub fn finish(&mut self, blink: &BlinkLimit) {
        self.force_outputs_off();
        info!("run complete, halting");
        self.blink(blink);
    }

    /// Blink the status LED at `timing.blink` on and off. Only the LED is
    /// written from here on.
    pub fn blink(&mut self, limit: &BlinkLimit) {
        let led = self.cfg.pins.status_led;
        let half = self.cfg.timing.blink;
        let mut cycles: u32 = 0;
        loop {
            match limit {
                BlinkLimit::Forever => {}
                BlinkLimit::Cycles(n) if cycles >= *n => break,
                BlinkLimit::Cycles(_) => {}
                BlinkLimit::UntilFlag(flag) if flag.load(Ordering::Relaxed) => break,
                BlinkLimit::UntilFlag(_) => {}
            }
            for level in [true, false] {
                if let Err(e) = self.write(led, level) {
                    warn!(error = %e, "status led write failed");
                }
                self.clock.sleep(half);
            }
            cycles = cycles.saturating_add(1);
        }
    }
}
