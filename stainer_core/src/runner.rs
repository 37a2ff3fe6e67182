//! Top-level run: every configured pass, then the halt state.

use stainer_traits::DigitalIo;
use tracing::info;

use crate::error::Result;
use crate::halt::BlinkLimit;
use crate::limits::Axis;
use crate::machine::Machine;
use crate::status::RunReport;

impl<I: DigitalIo> Machine<I> {
    /// Run all passes without halting afterwards.
    pub fn run_passes(&mut self) -> Result<RunReport> {
        let started = self.clock.now();
        let plan = self.cfg.run.passes.clone();
        let mut passes = Vec::with_capacity(plan.len());
        for home in plan {
            passes.push(self.run_pass(home)?);
        }
        let report = RunReport {
            passes,
            counters: self.counters,
            elapsed: self.clock.now().saturating_duration_since(started),
        };
        info!(
            horizontal = report.counters.get(Axis::Horizontal),
            vertical = report.counters.get(Axis::Vertical),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "all passes done"
        );
        Ok(report)
    }

    /// Run all passes and enter the halt state. A fault takes the stop path
    /// and is returned once `blink` lets go.
    pub fn run(&mut self, blink: &BlinkLimit) -> Result<RunReport> {
        match self.run_passes() {
            Ok(report) => {
                self.finish(blink);
                Ok(report)
            }
            Err(e) => {
                self.stop(&e, blink);
                Err(e)
            }
        }
    }
}
