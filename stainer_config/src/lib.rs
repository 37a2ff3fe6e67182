#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the staining machine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `Scenario` describes a simulated rig (axis lengths, operator taps) for
//!   the CLI `simulate` command.
use serde::Deserialize;

/// Travel direction as written in config files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectionName {
    Up,
    Down,
    Left,
    Right,
}

impl DirectionName {
    pub fn is_vertical(self) -> bool {
        matches!(self, DirectionName::Up | DirectionName::Down)
    }
}

/// Limit switch as written in scenario files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwitchName {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub top_limit: u8,
    pub bottom_limit: u8,
    pub left_limit: u8,
    pub right_limit: u8,
    pub top_spray: u8,
    pub bottom_spray: u8,
    pub status_led: u8,
    /// Treat a low level on a limit input as pressed
    #[serde(default)]
    pub limits_active_low: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriveKind {
    #[default]
    Stepper,
    Relay,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DriverPins {
    pub enable: u8,
    pub dir: u8,
    pub step: u8,
}

#[derive(Debug, Deserialize)]
pub struct AxisCfg {
    #[serde(default)]
    pub drive: DriveKind,
    /// Stepper drivers moved in lockstep (stepper drive only)
    #[serde(default)]
    pub drivers: Vec<DriverPins>,
    /// Driver enable input is active low (A4988/DRV8825 style)
    #[serde(default = "default_true")]
    pub enable_active_low: bool,
    /// Cruise delay per pulse phase (µs)
    pub min_delay_us: Option<u64>,
    /// Starting delay per pulse phase (µs)
    pub max_delay_us: Option<u64>,
    /// Steps spent accelerating from max_delay_us to min_delay_us
    pub ramp_steps: Option<u32>,
    /// Steps (stepper) or counted pulses (relay) per transition
    pub stroke_gap: Option<u32>,
    /// Relay drive only
    pub up_relay: Option<u8>,
    /// Relay drive only
    pub down_relay: Option<u8>,
    /// Relay drive only: pin wired to the travel pulse source
    pub pulse_in: Option<u8>,
    /// Relay drive only: poll interval while the motor runs (µs); falls
    /// back to `timing.poll_us`
    pub poll_us: Option<u64>,
}

/// Motion values of one axis after filling omitted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMotion {
    pub min_delay_us: u64,
    pub max_delay_us: u64,
    pub ramp_steps: u32,
    pub stroke_gap: u32,
}

impl AxisMotion {
    /// Reference rig horizontal axis.
    pub const HORIZONTAL: Self = Self {
        min_delay_us: 150,
        max_delay_us: 1600,
        ramp_steps: 600,
        stroke_gap: 3000,
    };
    /// Reference rig vertical axis.
    pub const VERTICAL: Self = Self {
        min_delay_us: 100,
        max_delay_us: 1000,
        ramp_steps: 1200,
        stroke_gap: 3000,
    };
}

impl AxisCfg {
    /// Configured motion values, `fallback` for whatever is left out.
    pub fn motion(&self, fallback: AxisMotion) -> AxisMotion {
        AxisMotion {
            min_delay_us: self.min_delay_us.unwrap_or(fallback.min_delay_us),
            max_delay_us: self.max_delay_us.unwrap_or(fallback.max_delay_us),
            ramp_steps: self.ramp_steps.unwrap_or(fallback.ramp_steps),
            stroke_gap: self.stroke_gap.unwrap_or(fallback.stroke_gap),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Axes {
    pub horizontal: AxisCfg,
    pub vertical: AxisCfg,
}

impl Axes {
    pub fn horizontal_motion(&self) -> AxisMotion {
        self.horizontal.motion(AxisMotion::HORIZONTAL)
    }

    pub fn vertical_motion(&self) -> AxisMotion {
        self.vertical.motion(AxisMotion::VERTICAL)
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DirectionLevels {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
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

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SprayCfg {
    /// Below this stroke count only the top spray works
    pub min: u32,
    /// Above this stroke count only the bottom spray works
    pub max: u32,
}

impl Default for SprayCfg {
    fn default() -> Self {
        Self { min: 2, max: 15 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingCfg {
    pub debounce_ms: u64,
    pub motor_rest_ms: u64,
    pub motor_switch_delay_ms: u64,
    pub blink_ms: u64,
    /// Poll interval for switch waits, and for relay moves without their own
    pub poll_us: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            motor_rest_ms: 1000,
            motor_switch_delay_ms: 3000,
            blink_ms: 300,
            poll_us: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct InductionCfg {
    pub power: u8,
    pub horizontal_select: u8,
    pub vertical_select: u8,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Strict,
    #[default]
    Lenient,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    /// The controller moves the head to the stroke endpoint
    #[default]
    Driven,
    /// Something else moves the head; the controller waits for the endpoint
    Passive,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PassCfg {
    /// Boundary the pass starts from; strokes advance toward its opposite
    pub home: DirectionName,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunCfg {
    pub strictness: Strictness,
    pub stroke_mode: StrokeMode,
    pub passes: Vec<PassCfg>,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            stroke_mode: StrokeMode::Driven,
            passes: vec![
                PassCfg {
                    home: DirectionName::Up,
                },
                PassCfg {
                    home: DirectionName::Left,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct Safety {
    /// Fatal stop when a single switch wait exceeds this many ms (0 disables)
    pub switch_wait_ms: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    pub axes: Axes,
    #[serde(default)]
    pub direction_levels: DirectionLevels,
    #[serde(default)]
    pub spray: SprayCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    /// Present on rigs whose strokes are driven by induction motors
    #[serde(default)]
    pub induction: Option<InductionCfg>,
    #[serde(default)]
    pub run: RunCfg,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub logging: Logging,
}

fn default_true() -> bool {
    true
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl AxisCfg {
    fn validate(&self, name: &str, motion: AxisMotion, vertical: bool) -> eyre::Result<()> {
        if motion.stroke_gap == 0 {
            eyre::bail!("axes.{name}.stroke_gap must be >= 1");
        }
        match self.drive {
            DriveKind::Stepper => {
                if self.drivers.is_empty() {
                    eyre::bail!("axes.{name}.drivers must list at least one driver");
                }
                if motion.min_delay_us == 0 {
                    eyre::bail!("axes.{name}.min_delay_us must be >= 1");
                }
                if motion.min_delay_us > motion.max_delay_us {
                    eyre::bail!("axes.{name}.min_delay_us must be <= max_delay_us");
                }
            }
            DriveKind::Relay => {
                if !vertical {
                    eyre::bail!("axes.{name}: relay drive is only supported on the vertical axis");
                }
                let (Some(up), Some(down)) = (self.up_relay, self.down_relay) else {
                    eyre::bail!("axes.{name}: relay drive needs up_relay and down_relay");
                };
                if up == down {
                    eyre::bail!("axes.{name}.up_relay and down_relay must differ");
                }
                // Transitions are measured in counted pulses only.
                if self.pulse_in.is_none() {
                    eyre::bail!("axes.{name}: relay drive needs pulse_in to count transition pulses");
                }
                if self.poll_us == Some(0) {
                    eyre::bail!("axes.{name}.poll_us must be >= 1");
                }
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let limits = [p.top_limit, p.bottom_limit, p.left_limit, p.right_limit];
        for (i, a) in limits.iter().enumerate() {
            if limits[i + 1..].contains(a) {
                eyre::bail!("pins: limit switch pin {a} is assigned twice");
            }
        }
        if p.top_spray == p.bottom_spray {
            eyre::bail!("pins.top_spray and pins.bottom_spray must differ");
        }

        // Axes
        self.axes
            .horizontal
            .validate("horizontal", self.axes.horizontal_motion(), false)?;
        self.axes
            .vertical
            .validate("vertical", self.axes.vertical_motion(), true)?;

        // Spray
        if self.spray.min > self.spray.max {
            eyre::bail!("spray.min must be <= spray.max");
        }

        // Timing
        if self.timing.debounce_ms == 0 {
            eyre::bail!("timing.debounce_ms must be >= 1");
        }
        if self.timing.blink_ms == 0 {
            eyre::bail!("timing.blink_ms must be >= 1");
        }
        if self.timing.poll_us == 0 {
            eyre::bail!("timing.poll_us must be >= 1");
        }

        // Induction
        if let Some(ind) = &self.induction
            && ind.horizontal_select == ind.vertical_select
        {
            eyre::bail!("induction.horizontal_select and vertical_select must differ");
        }

        // Run plan
        let passes = &self.run.passes;
        if passes.is_empty() || passes.len() > 2 {
            eyre::bail!("run.passes must contain one or two passes");
        }
        if passes.len() == 2 && passes[0].home.is_vertical() == passes[1].home.is_vertical() {
            eyre::bail!("run.passes must cover perpendicular axes");
        }

        // Safety
        if self.safety.switch_wait_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.switch_wait_ms is unreasonably large (>24h)");
        }

        Ok(())
    }
}

/// One simulated axis: travel length in steps (or relay ticks) and start position.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimAxisCfg {
    pub length: i64,
    pub start: i64,
}

impl Default for SimAxisCfg {
    fn default() -> Self {
        Self {
            length: 20_000,
            start: 10_000,
        }
    }
}

/// Simulated rig for the `simulate` command.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub horizontal: SimAxisCfg,
    pub vertical: SimAxisCfg,
    /// Operator taps, consumed in order whenever the controller sits idle
    /// polling the tapped switch.
    pub taps: Vec<SwitchName>,
    pub tap_press_ms: u64,
    pub tap_release_ms: u64,
    /// Controller must have been idle (no output writes) this long before a tap starts
    pub tap_idle_ms: u64,
    /// Status LED blink cycles to simulate once halted
    pub blink_cycles: u32,
    /// Switch-wait watchdog used when the config leaves it disabled
    pub switch_wait_ms: u64,
    /// Replaces `run.stroke_mode` for the simulation
    pub stroke_mode: Option<StrokeMode>,
    /// Replaces `run.passes` for the simulation
    pub passes: Option<Vec<PassCfg>>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            horizontal: SimAxisCfg::default(),
            vertical: SimAxisCfg::default(),
            taps: Vec::new(),
            tap_press_ms: 100,
            tap_release_ms: 100,
            tap_idle_ms: 50,
            blink_cycles: 3,
            switch_wait_ms: 60_000,
            stroke_mode: None,
            passes: None,
        }
    }
}

pub fn load_scenario_toml(s: &str) -> Result<Scenario, toml::de::Error> {
    toml::from_str::<Scenario>(s)
}

impl Scenario {
    pub fn validate(&self) -> eyre::Result<()> {
        for (name, axis) in [("horizontal", &self.horizontal), ("vertical", &self.vertical)] {
            if axis.length <= 0 {
                eyre::bail!("{name}.length must be > 0");
            }
            if !(0..=axis.length).contains(&axis.start) {
                eyre::bail!("{name}.start must be within 0..=length");
            }
        }
        if self.tap_press_ms == 0 || self.tap_release_ms == 0 {
            eyre::bail!("tap_press_ms and tap_release_ms must be >= 1");
        }
        if self.switch_wait_ms == 0 {
            eyre::bail!("switch_wait_ms must be >= 1 in a simulation");
        }
        if let Some(passes) = &self.passes
            && (passes.is_empty() || passes.len() > 2)
        {
            eyre::bail!("passes must contain one or two passes");
        }
        Ok(())
    }
}
