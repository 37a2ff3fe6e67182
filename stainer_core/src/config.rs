//! Runtime configuration of the staining machine.
//!
//! These are the structs the engine runs on. They are separate from the
//! TOML-deserialized config in `stainer_config`; see `conversions`.

use std::time::Duration;

use stainer_traits::PinId;

use crate::error::BuildError;
use crate::limits::{Axis, Direction, LimitSwitch};

/// Wiring of the switches, sprays and status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub top_limit: PinId,
    pub bottom_limit: PinId,
    pub left_limit: PinId,
    pub right_limit: PinId,
    pub top_spray: PinId,
    pub bottom_spray: PinId,
    pub status_led: PinId,
    /// A low level on a limit input means pressed.
    pub limits_active_low: bool,
}

impl Pins {
    pub fn limit(&self, switch: LimitSwitch) -> PinId {
        match switch {
            LimitSwitch::Top => self.top_limit,
            LimitSwitch::Bottom => self.bottom_limit,
            LimitSwitch::Left => self.left_limit,
            LimitSwitch::Right => self.right_limit,
        }
    }
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            top_limit: 42,
            bottom_limit: 39,
            left_limit: 41,
            right_limit: 38,
            top_spray: 34,
            bottom_spray: 35,
            status_led: 13,
            limits_active_low: false,
        }
    }
}

/// Per-phase step delays of a ramped move.
///
/// Invariant: `min_delay_us <= max_delay_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionProfile {
    /// Cruise delay (µs), reached exactly at step `ramp_steps`.
    pub min_delay_us: u64,
    /// Delay the ramp starts from (µs).
    pub max_delay_us: u64,
    pub ramp_steps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverPins {
    pub enable: PinId,
    pub dir: PinId,
    pub step: PinId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisDrive {
    /// One or more stepper drivers pulsed in lockstep.
    Stepper {
        drivers: Vec<DriverPins>,
        enable_active_low: bool,
        profile: MotionProfile,
    },
    /// Continuously running motor switched by two relays; distance is
    /// measured by the interrupt-fed step counter. `poll_us` overrides
    /// `timing.poll_us` while the motor runs.
    Relay {
        up: PinId,
        down: PinId,
        poll_us: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisCfg {
    pub drive: AxisDrive,
    /// Steps (or counted pulses) per transition.
    pub stroke_gap: u32,
}

impl AxisCfg {
    fn validate(&self, axis: Axis) -> Result<(), BuildError> {
        if self.stroke_gap == 0 {
            return Err(BuildError::InvalidConfig(format!(
                "{axis} stroke_gap must be >= 1"
            )));
        }
        match &self.drive {
            AxisDrive::Stepper {
                drivers, profile, ..
            } => {
                if drivers.is_empty() {
                    return Err(BuildError::InvalidConfig(format!(
                        "{axis} axis has no stepper drivers"
                    )));
                }
                if profile.min_delay_us == 0 {
                    return Err(BuildError::InvalidConfig(format!(
                        "{axis} min_delay_us must be >= 1"
                    )));
                }
                if profile.min_delay_us > profile.max_delay_us {
                    return Err(BuildError::InvalidConfig(format!(
                        "{axis} min_delay_us must be <= max_delay_us"
                    )));
                }
            }
            AxisDrive::Relay { up, down, poll_us } => {
                if axis == Axis::Horizontal {
                    return Err(BuildError::InvalidConfig(
                        "relay drive is only supported on the vertical axis".into(),
                    ));
                }
                if up == down {
                    return Err(BuildError::InvalidConfig(
                        "up and down relays must differ".into(),
                    ));
                }
                if *poll_us == Some(0) {
                    return Err(BuildError::InvalidConfig(
                        "relay poll_us must be >= 1".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// DIR output level that moves each way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionLevels {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionLevels {
    pub fn level(&self, d: Direction) -> bool {
        match d {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

impl Default for DirectionLevels {
    fn default() -> Self {
        Self {
            up: false,
            down: true,
            left: true,
            right: false,
        }
    }
}

/// Stroke-count thresholds. Below `min` only the top spray works, above
/// `max` only the bottom one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprayThresholds {
    pub min: u32,
    pub max: u32,
}

impl Default for SprayThresholds {
    fn default() -> Self {
        Self { min: 2, max: 15 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Settle time after a switch changes state.
    pub debounce: Duration,
    /// Drivers stay de-energized this long after a move.
    pub motor_rest: Duration,
    /// Induction motors stay off this long before another is selected.
    pub motor_switch_delay: Duration,
    /// Half period of the halt blink.
    pub blink: Duration,
    /// Poll interval of switch waits and relay moves (µs).
    pub poll_us: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(150),
            motor_rest: Duration::from_millis(1000),
            motor_switch_delay: Duration::from_millis(3000),
            blink: Duration::from_millis(300),
            poll_us: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InductionPins {
    pub power: PinId,
    pub horizontal_select: PinId,
    pub vertical_select: PinId,
}

/// How invariant breaches that some rigs tolerate are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Precondition breaches, simultaneous presses and a boundary tripping
    /// mid-transition halt the machine.
    Strict,
    /// The same situations are logged and tolerated.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeMode {
    /// The controller drives the head to the stroke endpoint.
    #[default]
    Driven,
    /// The head is moved by something else; the controller waits for the endpoint.
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub strictness: Strictness,
    pub stroke_mode: StrokeMode,
    /// Home boundary of each pass, in order.
    pub passes: Vec<Direction>,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            stroke_mode: StrokeMode::Driven,
            passes: vec![Direction::Up, Direction::Left],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyCfg {
    /// A switch wait longer than this is fatal. 0 waits forever.
    pub switch_wait_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineCfg {
    pub pins: Pins,
    pub horizontal: AxisCfg,
    pub vertical: AxisCfg,
    pub levels: DirectionLevels,
    pub spray: SprayThresholds,
    pub timing: Timing,
    pub induction: Option<InductionPins>,
    pub run: RunPlan,
    pub safety: SafetyCfg,
}

impl MachineCfg {
    pub fn axis(&self, axis: Axis) -> &AxisCfg {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }

    /// Every actuator output with its de-energized level. The halt path
    /// drives exactly these.
    pub fn safe_outputs(&self) -> Vec<(PinId, bool)> {
        let mut out = vec![(self.pins.top_spray, false), (self.pins.bottom_spray, false)];
        if let Some(ind) = &self.induction {
            out.push((ind.power, false));
            out.push((ind.horizontal_select, false));
            out.push((ind.vertical_select, false));
        }
        for axis in [&self.horizontal, &self.vertical] {
            match &axis.drive {
                AxisDrive::Stepper {
                    drivers,
                    enable_active_low,
                    ..
                } => {
                    for d in drivers {
                        out.push((d.step, false));
                        out.push((d.enable, *enable_active_low));
                    }
                }
                AxisDrive::Relay { up, down, .. } => {
                    out.push((*up, false));
                    out.push((*down, false));
                }
            }
        }
        out
    }

    /// The four limit switch inputs.
    pub fn input_pins(&self) -> Vec<PinId> {
        LimitSwitch::ALL.iter().map(|s| self.pins.limit(*s)).collect()
    }

    /// Every pin the controller drives, each listed once.
    pub fn output_pins(&self) -> Vec<PinId> {
        let mut out: Vec<PinId> = self.safe_outputs().into_iter().map(|(p, _)| p).collect();
        for axis in [&self.horizontal, &self.vertical] {
            if let AxisDrive::Stepper { drivers, .. } = &axis.drive {
                out.extend(drivers.iter().map(|d| d.dir));
            }
        }
        out.push(self.pins.status_led);
        let mut seen = std::collections::HashSet::new();
        out.retain(|p| seen.insert(*p));
        out
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        self.horizontal.validate(Axis::Horizontal)?;
        self.vertical.validate(Axis::Vertical)?;
        if self.spray.min > self.spray.max {
            return Err(BuildError::InvalidConfig(
                "spray min must be <= max".into(),
            ));
        }
        if self.timing.debounce.is_zero() {
            return Err(BuildError::InvalidConfig("debounce must be > 0".into()));
        }
        if self.timing.blink.is_zero() {
            return Err(BuildError::InvalidConfig("blink must be > 0".into()));
        }
        if self.timing.poll_us == 0 {
            return Err(BuildError::InvalidConfig("poll_us must be >= 1".into()));
        }
        let passes = &self.run.passes;
        if passes.is_empty() || passes.len() > 2 {
            return Err(BuildError::InvalidConfig(
                "run plan needs one or two passes".into(),
            ));
        }
        if passes.len() == 2 && passes[0].axis() == passes[1].axis() {
            return Err(BuildError::InvalidConfig(
                "passes must cover perpendicular axes".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MachineCfg {
    /// The reference rig: stepper driven on both axes, two vertical motors.
    fn default() -> Self {
        Self {
            pins: Pins::default(),
            horizontal: AxisCfg {
                drive: AxisDrive::Stepper {
                    drivers: vec![DriverPins {
                        enable: 25,
                        dir: 23,
                        step: 24,
                    }],
                    enable_active_low: true,
                    profile: MotionProfile {
                        min_delay_us: 150,
                        max_delay_us: 1600,
                        ramp_steps: 600,
                    },
                },
                stroke_gap: 3000,
            },
            vertical: AxisCfg {
                drive: AxisDrive::Stepper {
                    drivers: vec![
                        DriverPins {
                            enable: 28,
                            dir: 27,
                            step: 26,
                        },
                        DriverPins {
                            enable: 32,
                            dir: 31,
                            step: 30,
                        },
                    ],
                    enable_active_low: true,
                    profile: MotionProfile {
                        min_delay_us: 100,
                        max_delay_us: 1000,
                        ramp_steps: 1200,
                    },
                },
                stroke_gap: 3000,
            },
            levels: DirectionLevels::default(),
            spray: SprayThresholds::default(),
            timing: Timing::default(),
            induction: None,
            run: RunPlan::default(),
            safety: SafetyCfg::default(),
        }
    }
}
