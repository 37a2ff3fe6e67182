//! `From` implementations bridging `stainer_config` types to `stainer_core` types.

use std::time::Duration;

use crate::config::{
    AxisCfg, AxisDrive, DirectionLevels, DriverPins, InductionPins, MachineCfg, MotionProfile,
    Pins, RunPlan, SafetyCfg, SprayThresholds, Strictness, StrokeMode, Timing,
};
use crate::limits::Direction;

// ── Pins ─────────────────────────────────────────────────────────────────────

impl From<&stainer_config::Pins> for Pins {
    fn from(c: &stainer_config::Pins) -> Self {
        Self {
            top_limit: c.top_limit,
            bottom_limit: c.bottom_limit,
            left_limit: c.left_limit,
            right_limit: c.right_limit,
            top_spray: c.top_spray,
            bottom_spray: c.bottom_spray,
            status_led: c.status_led,
            limits_active_low: c.limits_active_low,
        }
    }
}

// ── Axes ─────────────────────────────────────────────────────────────────────

/// Core axis config; fields the file leaves out come from `fallback`.
fn axis_cfg(c: &stainer_config::AxisCfg, fallback: stainer_config::AxisMotion) -> AxisCfg {
    let motion = c.motion(fallback);
    let drive = match c.drive {
        stainer_config::DriveKind::Stepper => AxisDrive::Stepper {
            drivers: c
                .drivers
                .iter()
                .map(|d| DriverPins {
                    enable: d.enable,
                    dir: d.dir,
                    step: d.step,
                })
                .collect(),
            enable_active_low: c.enable_active_low,
            profile: MotionProfile {
                min_delay_us: motion.min_delay_us,
                max_delay_us: motion.max_delay_us,
                ramp_steps: motion.ramp_steps,
            },
        },
        // Validated config always carries both relays; a missing one
        // collapses onto the other and is rejected by `MachineCfg::validate`.
        stainer_config::DriveKind::Relay => {
            let up = c.up_relay.or(c.down_relay).unwrap_or_default();
            let down = c.down_relay.unwrap_or(up);
            AxisDrive::Relay {
                up,
                down,
                poll_us: c.poll_us,
            }
        }
    };
    AxisCfg {
        drive,
        stroke_gap: motion.stroke_gap,
    }
}

// ── Levels, spray, timing ────────────────────────────────────────────────────

impl From<&stainer_config::DirectionLevels> for DirectionLevels {
    fn from(c: &stainer_config::DirectionLevels) -> Self {
        Self {
            up: c.up,
            down: c.down,
            left: c.left,
            right: c.right,
        }
    }
}

impl From<&stainer_config::SprayCfg> for SprayThresholds {
    fn from(c: &stainer_config::SprayCfg) -> Self {
        Self {
            min: c.min,
            max: c.max,
        }
    }
}

impl From<&stainer_config::TimingCfg> for Timing {
    fn from(c: &stainer_config::TimingCfg) -> Self {
        Self {
            debounce: Duration::from_millis(c.debounce_ms),
            motor_rest: Duration::from_millis(c.motor_rest_ms),
            motor_switch_delay: Duration::from_millis(c.motor_switch_delay_ms),
            blink: Duration::from_millis(c.blink_ms),
            poll_us: c.poll_us,
        }
    }
}

impl From<&stainer_config::InductionCfg> for InductionPins {
    fn from(c: &stainer_config::InductionCfg) -> Self {
        Self {
            power: c.power,
            horizontal_select: c.horizontal_select,
            vertical_select: c.vertical_select,
        }
    }
}

// ── Run plan ─────────────────────────────────────────────────────────────────

impl From<stainer_config::Strictness> for Strictness {
    fn from(c: stainer_config::Strictness) -> Self {
        match c {
            stainer_config::Strictness::Strict => Strictness::Strict,
            stainer_config::Strictness::Lenient => Strictness::Lenient,
        }
    }
}

impl From<stainer_config::StrokeMode> for StrokeMode {
    fn from(c: stainer_config::StrokeMode) -> Self {
        match c {
            stainer_config::StrokeMode::Driven => StrokeMode::Driven,
            stainer_config::StrokeMode::Passive => StrokeMode::Passive,
        }
    }
}

impl From<&stainer_config::RunCfg> for RunPlan {
    fn from(c: &stainer_config::RunCfg) -> Self {
        Self {
            strictness: c.strictness.into(),
            stroke_mode: c.stroke_mode.into(),
            passes: c.passes.iter().map(|p| Direction::from(p.home)).collect(),
        }
    }
}

impl From<&stainer_config::Safety> for SafetyCfg {
    fn from(c: &stainer_config::Safety) -> Self {
        Self {
            switch_wait_ms: c.switch_wait_ms,
        }
    }
}

// ── Whole machine ────────────────────────────────────────────────────────────

impl From<&stainer_config::Config> for MachineCfg {
    fn from(c: &stainer_config::Config) -> Self {
        Self {
            pins: (&c.pins).into(),
            horizontal: axis_cfg(&c.axes.horizontal, stainer_config::AxisMotion::HORIZONTAL),
            vertical: axis_cfg(&c.axes.vertical, stainer_config::AxisMotion::VERTICAL),
            levels: (&c.direction_levels).into(),
            spray: (&c.spray).into(),
            timing: (&c.timing).into(),
            induction: c.induction.as_ref().map(InductionPins::from),
            run: (&c.run).into(),
            safety: (&c.safety).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_matches_default_rig() {
        let text = include_str!("../../etc/stainer.toml");
        let cfg = stainer_config::load_toml(text).expect("parse");
        let machine = MachineCfg::from(&cfg);
        assert_eq!(machine, MachineCfg::default());
    }

    #[test]
    fn relay_axis_converts() {
        let axis = stainer_config::AxisCfg {
            drive: stainer_config::DriveKind::Relay,
            drivers: Vec::new(),
            enable_active_low: true,
            min_delay_us: None,
            max_delay_us: None,
            ramp_steps: None,
            stroke_gap: Some(40),
            up_relay: Some(36),
            down_relay: Some(37),
            pulse_in: Some(2),
            poll_us: Some(500),
        };
        let core = axis_cfg(&axis, stainer_config::AxisMotion::VERTICAL);
        assert_eq!(
            core.drive,
            AxisDrive::Relay {
                up: 36,
                down: 37,
                poll_us: Some(500)
            }
        );
        assert_eq!(core.stroke_gap, 40);
    }

    #[test]
    fn omitted_stepper_fields_take_the_axis_defaults() {
        let text = include_str!("../../etc/stainer.toml")
            .replace("min_delay_us = 150\n", "")
            .replace("ramp_steps = 1200\n", "")
            .replace("stroke_gap = 3000\n", "");
        let cfg = stainer_config::load_toml(&text).expect("parse");
        cfg.validate().expect("defaults fill the gaps");
        assert_eq!(MachineCfg::from(&cfg), MachineCfg::default());
    }
}
