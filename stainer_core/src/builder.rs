//! Builder for [`Machine`].
//!
//! I/O and configuration are required; the clock defaults to
//! [`MonotonicClock`] and the step counter to a fresh one.

use std::sync::Arc;

use stainer_traits::{Clock, DigitalIo, MonotonicClock, StepCounter};

use crate::config::MachineCfg;
use crate::error::{BuildError, Result};
use crate::induction::InductionState;
use crate::machine::{Machine, StrokeCounters};

pub struct MachineBuilder<I> {
    io: Option<I>,
    cfg: Option<MachineCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    step_counter: Option<StepCounter>,
}

impl<I> Default for MachineBuilder<I> {
    fn default() -> Self {
        Self {
            io: None,
            cfg: None,
            clock: None,
            step_counter: None,
        }
    }
}

impl<I: DigitalIo> MachineBuilder<I> {
    pub fn with_io(mut self, io: I) -> Self {
        self.io = Some(io);
        self
    }

    pub fn with_config(mut self, cfg: MachineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Inject a clock (e.g. a `VirtualClock` shared with a simulated rig).
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Share the counter fed by the relay axis pulse source.
    pub fn with_step_counter(mut self, counter: StepCounter) -> Self {
        self.step_counter = Some(counter);
        self
    }

    pub fn build(self) -> Result<Machine<I>> {
        let io = self.io.ok_or_else(|| eyre::Report::new(BuildError::MissingIo))?;
        let cfg = self
            .cfg
            .ok_or_else(|| eyre::Report::new(BuildError::MissingConfig))?;
        cfg.validate().map_err(eyre::Report::new)?;
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        Ok(Machine {
            io,
            clock,
            cfg,
            counters: StrokeCounters::default(),
            induction: InductionState::None,
            step_counter: self.step_counter.unwrap_or_default(),
        })
    }
}
