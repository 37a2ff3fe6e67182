#![allow(dead_code)]

use std::time::Duration;

use stainer_core::{AxisDrive, Machine, MachineCfg, MotionProfile, Pins};
use stainer_hardware::{SimAxis, SimDrive, SimulatedIo};
use stainer_traits::{PinId, VirtualClock};

/// Shorter than the debounce, so a tap is over by the time a press returns.
pub const TAP: Duration = Duration::from_millis(100);
pub const IDLE: Duration = Duration::from_millis(50);

/// Reference rig with short strokes and ramps so tests stay quick.
pub fn small_cfg() -> MachineCfg {
    let mut cfg = MachineCfg::default();
    for axis in [&mut cfg.horizontal, &mut cfg.vertical] {
        axis.stroke_gap = 10;
        if let AxisDrive::Stepper { profile, .. } = &mut axis.drive {
            *profile = MotionProfile {
                min_delay_us: 100,
                max_delay_us: 400,
                ramp_steps: 4,
            };
        }
    }
    cfg
}

pub fn sim() -> SimulatedIo {
    SimulatedIo::new(VirtualClock::new())
}

pub fn machine(io: &SimulatedIo, cfg: MachineCfg) -> Machine<SimulatedIo> {
    Machine::builder()
        .with_io(io.clone())
        .with_clock(io.clock().clone())
        .with_config(cfg)
        .build()
        .expect("machine build")
}

pub fn first_driver(drive: &AxisDrive) -> (PinId, PinId) {
    match drive {
        AxisDrive::Stepper { drivers, .. } => (drivers[0].step, drivers[0].dir),
        AxisDrive::Relay { .. } => panic!("stepper axis expected"),
    }
}

/// Positional horizontal axis: left at 0, right at `length`.
pub fn horizontal_axis(io: &SimulatedIo, cfg: &MachineCfg, length: i64, start: i64) -> usize {
    let (step, dir) = first_driver(&cfg.horizontal.drive);
    io.add_axis(SimAxis {
        drive: SimDrive::Stepper {
            step,
            dir,
            increasing_level: cfg.levels.right,
        },
        min_limit: cfg.pins.left_limit,
        max_limit: cfg.pins.right_limit,
        length,
        position: start,
    })
}

/// Positional vertical axis: top at 0, bottom at `length`.
pub fn vertical_axis(io: &SimulatedIo, cfg: &MachineCfg, length: i64, start: i64) -> usize {
    let (step, dir) = first_driver(&cfg.vertical.drive);
    io.add_axis(SimAxis {
        drive: SimDrive::Stepper {
            step,
            dir,
            increasing_level: cfg.levels.down,
        },
        min_limit: cfg.pins.top_limit,
        max_limit: cfg.pins.bottom_limit,
        length,
        position: start,
    })
}

pub fn taps(io: &SimulatedIo, pins: &[PinId]) {
    io.queue_taps(pins, TAP, TAP, IDLE);
}

pub fn rising_edges(io: &SimulatedIo, pin: PinId) -> usize {
    io.writes_to(pin).iter().filter(|&&h| h).count()
}

pub fn pins() -> Pins {
    Pins::default()
}
