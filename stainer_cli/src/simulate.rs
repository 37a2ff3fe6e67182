//! `stainer simulate`: the real engine against a simulated rig.
//!
//! Both axes are positional models sized by the scenario; operator taps are
//! fed in order. Time is virtual, so a run of several minutes on the
//! machine finishes at once.

use stainer_config::{Config, Scenario};
use stainer_core::{
    AxisDrive, BlinkLimit, Direction, Machine, MachineCfg, RunReport, StrokeMode,
};
use stainer_hardware::{SimAxis, SimDrive, SimulatedIo};
use stainer_traits::{PinId, StepCounter, VirtualClock};
use std::time::Duration;

use crate::cli::{CliSafety, LAST_SAFETY};

/// What the simulated rig looked like once the machine halted.
#[derive(Debug, Clone)]
pub struct SimSummary {
    pub report: RunReport,
    pub sim_time: Duration,
    pub writes: usize,
    pub pending_taps: usize,
    pub horizontal_position: i64,
    pub vertical_position: i64,
}

/// Machine config as the simulation runs it: scenario overrides applied and
/// a watchdog always armed so a missing tap ends the run.
pub fn effective_config(cfg: &Config, scenario: &Scenario) -> MachineCfg {
    let mut machine = MachineCfg::from(cfg);
    if let Some(mode) = scenario.stroke_mode {
        machine.run.stroke_mode = StrokeMode::from(mode);
    }
    if let Some(passes) = &scenario.passes {
        machine.run.passes = passes.iter().map(|p| Direction::from(p.home)).collect();
    }
    if machine.safety.switch_wait_ms == 0 {
        machine.safety.switch_wait_ms = scenario.switch_wait_ms;
    }
    machine
}

fn stepper_drive(drive: &AxisDrive, increasing_level: bool) -> Option<SimDrive> {
    match drive {
        AxisDrive::Stepper { drivers, .. } => drivers.first().map(|d| SimDrive::Stepper {
            step: d.step,
            dir: d.dir,
            increasing_level,
        }),
        AxisDrive::Relay { .. } => None,
    }
}

/// A simulated rig and the indices of its axes.
pub struct SimRig {
    pub io: SimulatedIo,
    pub horizontal: Option<usize>,
    pub vertical: Option<usize>,
}

/// Build the simulated rig for `machine` and `scenario`.
pub fn build_rig(machine: &MachineCfg, scenario: &Scenario, counter: &StepCounter) -> SimRig {
    let io = SimulatedIo::new(VirtualClock::new());
    io.set_limits_active_low(machine.pins.limits_active_low);

    let h_drive = stepper_drive(&machine.horizontal.drive, machine.levels.right);
    let v_drive = match &machine.vertical.drive {
        // Position grows toward the bottom limit.
        AxisDrive::Relay { up, down, .. } => Some(SimDrive::Relay {
            increase: *down,
            decrease: *up,
            counter: Some(counter.clone()),
        }),
        stepper => stepper_drive(stepper, machine.levels.down),
    };
    let horizontal = h_drive.map(|drive| {
        io.add_axis(SimAxis {
            drive,
            min_limit: machine.pins.left_limit,
            max_limit: machine.pins.right_limit,
            length: scenario.horizontal.length,
            position: scenario.horizontal.start,
        })
    });
    let vertical = v_drive.map(|drive| {
        io.add_axis(SimAxis {
            drive,
            min_limit: machine.pins.top_limit,
            max_limit: machine.pins.bottom_limit,
            length: scenario.vertical.length,
            position: scenario.vertical.start,
        })
    });
    if let Some(ind) = &machine.induction {
        if let Some(h) = horizontal {
            io.add_induction(ind.power, ind.horizontal_select, h);
        }
        if let Some(v) = vertical {
            io.add_induction(ind.power, ind.vertical_select, v);
        }
    }

    let taps: Vec<PinId> = scenario
        .taps
        .iter()
        .map(|s| machine.pins.limit((*s).into()))
        .collect();
    io.queue_taps(
        &taps,
        Duration::from_millis(scenario.tap_press_ms),
        Duration::from_millis(scenario.tap_release_ms),
        Duration::from_millis(scenario.tap_idle_ms),
    );
    SimRig {
        io,
        horizontal,
        vertical,
    }
}

pub fn run_simulation(cfg: &Config, scenario: &Scenario) -> eyre::Result<SimSummary> {
    let machine_cfg = effective_config(cfg, scenario);
    let _ = LAST_SAFETY.set(CliSafety {
        switch_wait_ms: machine_cfg.safety.switch_wait_ms,
    });
    let counter = StepCounter::new();
    let rig = build_rig(&machine_cfg, scenario, &counter);
    let io = rig.io;
    tracing::info!(
        taps = scenario.taps.len(),
        passes = machine_cfg.run.passes.len(),
        switch_wait_ms = machine_cfg.safety.switch_wait_ms,
        "simulation start"
    );

    let mut machine = Machine::builder()
        .with_io(io.clone())
        .with_clock(io.clock().clone())
        .with_step_counter(counter)
        .with_config(machine_cfg)
        .build()?;
    let report = machine.run(&BlinkLimit::Cycles(scenario.blink_cycles))?;

    let position = |axis: Option<usize>| axis.and_then(|i| io.position(i)).unwrap_or_default();
    Ok(SimSummary {
        report,
        sim_time: io.clock().elapsed(),
        writes: io.writes().len(),
        pending_taps: io.pending_taps(),
        horizontal_position: position(rig.horizontal),
        vertical_position: position(rig.vertical),
    })
}
