//! Outcomes reported by moves, strokes and whole runs.

use std::time::Duration;

use crate::limits::{Axis, Direction, LimitSwitch};
use crate::machine::StrokeCounters;
use crate::spray::SprayConfiguration;

/// Why a move stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStop {
    /// The limit switch of the travel direction tripped.
    Limit,
    /// The step budget ran out first.
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Steps issued (stepper) or pulses counted (relay).
    pub steps: u32,
    pub stop: MoveStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeReport {
    pub axis: Axis,
    pub endpoint: LimitSwitch,
    pub spray: SprayConfiguration,
    /// Strokes completed on `axis` including this one.
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub home: Direction,
    pub strokes: Vec<StrokeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub passes: Vec<PassReport>,
    pub counters: StrokeCounters,
    /// Machine time from the first command to the halt.
    pub elapsed: Duration,
}
