use thiserror::Error;

/// Invariant violations that end a run in the halt state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    #[error("both limit switches of one axis pressed")]
    BothLimitsPressed,
    #[error("switch already pressed when a press was awaited")]
    AlreadyPressed,
    #[error("switch not pressed when a release was awaited")]
    NotPressed,
    #[error("unknown direction code {0}")]
    UnknownDirection(u8),
    #[error("boundary limit reached mid-transition")]
    BoundaryReachedMidTransition,
    #[error("timed out waiting for a switch")]
    WaitTimeout,
}

#[derive(Debug, Error, Clone)]
pub enum StainerError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("fault: {0}")]
    Fault(FaultReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing digital io")]
    MissingIo,
    #[error("missing machine config")]
    MissingConfig,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Wrap a fault reason into a report that keeps it downcastable.
pub fn fault(reason: FaultReason) -> Report {
    Report::new(StainerError::Fault(reason))
}

/// Find the fault reason anywhere in a report's chain.
pub fn fault_reason(e: &Report) -> Option<FaultReason> {
    e.chain().find_map(|c| match c.downcast_ref::<StainerError>() {
        Some(StainerError::Fault(r)) => Some(*r),
        _ => None,
    })
}
