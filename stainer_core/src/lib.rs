#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Staining machine control (hardware-agnostic).
//!
//! All hardware interaction goes through `stainer_traits::DigitalIo` and
//! `stainer_traits::Clock`, so the same engine runs against GPIO or a
//! simulated rig.
//!
//! ## Architecture
//!
//! - **Switches**: debounced press/release waits (`switches`)
//! - **Limits**: direction ↔ limit switch mapping (`limits`)
//! - **Spray**: valve policy by stroke count (`spray`)
//! - **Motion**: ramped stepper moves and counted relay moves (`motion`)
//! - **Strokes**: double-tap stroke start detection (`stroke`)
//! - **Passes**: homing, strokes and transitions across an axis (`pass`)
//! - **Halt**: fatal stop and status LED blink (`halt`)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod halt;
pub mod hw_error;
pub mod induction;
pub mod limits;
pub mod machine;
pub mod motion;
pub mod pass;
pub mod runner;
pub mod spray;
pub mod status;
pub mod stroke;
pub mod switches;

pub use builder::MachineBuilder;
pub use config::{
    AxisCfg, AxisDrive, DirectionLevels, DriverPins, InductionPins, MachineCfg, MotionProfile,
    Pins, RunPlan, SafetyCfg, SprayThresholds, Strictness, StrokeMode, Timing,
};
pub use error::{BuildError, FaultReason, StainerError, fault_reason};
pub use halt::BlinkLimit;
pub use induction::InductionState;
pub use limits::{Axis, Direction, LimitSwitch, direction_for, limit_for};
pub use machine::{Machine, StrokeCounters};
pub use motion::{Ramp, StepBudget, ramp_delay_us, step_pulse};
pub use spray::{SprayConfiguration, select_spray};
pub use status::{MoveOutcome, MoveStop, PassReport, RunReport, StrokeReport};
