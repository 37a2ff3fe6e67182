mod common;

use common::*;
use std::time::Duration;

use stainer_core::{
    AxisDrive, Direction, FaultReason, LimitSwitch, Machine, MoveStop, StepBudget, Strictness,
    fault_reason,
};
use stainer_hardware::{SimAxis, SimDrive};
use stainer_traits::StepCounter;

#[test]
fn bounded_transition_issues_exactly_the_budget() {
    let io = sim();
    let cfg = small_cfg();
    let (step, _) = first_driver(&cfg.vertical.drive);
    let mut m = machine(&io, cfg);

    let out = m.transition(Direction::Down).expect("transition");
    assert_eq!(out.steps, 10);
    assert_eq!(out.stop, MoveStop::Budget);
    assert_eq!(rising_edges(&io, step), 10);
}

#[test]
fn go_until_limit_stops_at_the_switch() {
    let io = sim();
    let cfg = small_cfg();
    let axis = horizontal_axis(&io, &cfg, 40, 25);
    let mut m = machine(&io, cfg);

    let out = m.go_until_limit(Direction::Left).expect("move");
    assert_eq!(out.stop, MoveStop::Limit);
    assert_eq!(out.steps, 25);
    assert_eq!(io.position(axis), Some(0));
    assert!(m.is_pressed(stainer_core::LimitSwitch::Left).expect("read"));
}

#[test]
fn limit_already_pressed_issues_no_steps() {
    let io = sim();
    let cfg = small_cfg();
    let (step, _) = first_driver(&cfg.horizontal.drive);
    io.hold(cfg.pins.right_limit, true);
    let mut m = machine(&io, cfg);

    let out = m
        .move_toward(Direction::Right, StepBudget::AtMost(100))
        .expect("move");
    assert_eq!(out.steps, 0);
    assert_eq!(out.stop, MoveStop::Limit);
    assert_eq!(rising_edges(&io, step), 0);
}

#[test]
fn lockstep_drivers_share_direction_and_pulses() {
    let io = sim();
    let cfg = small_cfg();
    let drivers = match &cfg.vertical.drive {
        AxisDrive::Stepper { drivers, .. } => drivers.clone(),
        AxisDrive::Relay { .. } => unreachable!(),
    };
    let down = cfg.levels.down;
    let mut m = machine(&io, cfg);

    m.move_toward(Direction::Down, StepBudget::AtMost(6))
        .expect("move");
    for d in &drivers {
        assert_eq!(rising_edges(&io, d.step), 6);
        assert!(io.writes_to(d.dir).iter().all(|&lvl| lvl == down));
    }
}

#[test]
fn drivers_rest_then_re_energize_after_a_move() {
    let io = sim();
    let cfg = small_cfg();
    let (enable, rest) = match &cfg.horizontal.drive {
        AxisDrive::Stepper {
            drivers,
            enable_active_low,
            ..
        } => (drivers[0].enable, *enable_active_low),
        AxisDrive::Relay { .. } => unreachable!(),
    };
    assert!(rest, "reference rig drivers are active low");
    let motor_rest = cfg.timing.motor_rest;
    let mut m = machine(&io, cfg);

    m.move_toward(Direction::Left, StepBudget::AtMost(3))
        .expect("move");
    // on (low), off (high), on (low)
    assert_eq!(io.writes_to(enable), vec![false, true, false]);
    let writes: Vec<_> = io.writes().into_iter().filter(|w| w.pin == enable).collect();
    assert!(writes[2].at - writes[1].at >= motor_rest);
}

#[test]
fn step_phases_follow_the_ramp() {
    let io = sim();
    let cfg = small_cfg();
    let (step, _) = first_driver(&cfg.horizontal.drive);
    let mut m = machine(&io, cfg);

    m.move_toward(Direction::Right, StepBudget::AtMost(6))
        .expect("move");
    let edges: Vec<_> = io.writes().into_iter().filter(|w| w.pin == step).collect();
    // high phase of each step lasts the step's delay
    let highs: Vec<u128> = edges
        .chunks(2)
        .map(|p| (p[1].at - p[0].at).as_micros())
        .collect();
    // 400 - 300*k/4 for k = 1..=3, then cruise at 100
    assert_eq!(highs, vec![325, 250, 175, 100, 100, 100]);
}

#[test]
fn active_low_limits_are_inverted() {
    let io = sim();
    io.set_limits_active_low(true);
    let mut cfg = small_cfg();
    cfg.pins.limits_active_low = true;
    horizontal_axis(&io, &cfg, 5, 2);
    let mut m = machine(&io, cfg);

    let out = m.go_until_limit(Direction::Right).expect("move");
    assert_eq!((out.steps, out.stop), (3, MoveStop::Limit));
}

fn relay_rig(length: i64, start: i64) -> (stainer_hardware::SimulatedIo, Machine<stainer_hardware::SimulatedIo>, usize) {
    relay_rig_polling(length, start, None)
}

fn relay_rig_polling(
    length: i64,
    start: i64,
    poll_us: Option<u64>,
) -> (stainer_hardware::SimulatedIo, Machine<stainer_hardware::SimulatedIo>, usize) {
    let io = sim();
    let mut cfg = small_cfg();
    cfg.vertical.drive = AxisDrive::Relay {
        up: 36,
        down: 37,
        poll_us,
    };
    cfg.vertical.stroke_gap = 8;
    let counter = StepCounter::new();
    let axis = io.add_axis(SimAxis {
        drive: SimDrive::Relay {
            increase: 37,
            decrease: 36,
            counter: Some(counter.clone()),
        },
        min_limit: cfg.pins.top_limit,
        max_limit: cfg.pins.bottom_limit,
        length,
        position: start,
    });
    let m = Machine::builder()
        .with_io(io.clone())
        .with_clock(io.clock().clone())
        .with_config(cfg)
        .with_step_counter(counter)
        .build()
        .expect("build");
    (io, m, axis)
}

#[test]
fn relay_transition_stops_on_counted_pulses() {
    let (io, mut m, axis) = relay_rig(100, 10);
    m.step_counter().pulse(); // stale pulses from an earlier move
    let out = m.transition(Direction::Down).expect("transition");
    assert_eq!(out.stop, MoveStop::Budget);
    assert_eq!(out.steps, 8);
    assert_eq!(io.position(axis), Some(18));
    assert!(!io.level(36) && !io.level(37), "both relays released");
}

#[test]
fn relay_go_until_limit_runs_to_the_switch() {
    let (io, mut m, axis) = relay_rig(100, 10);
    let out = m.go_until_limit(Direction::Up).expect("move");
    assert_eq!(out.stop, MoveStop::Limit);
    assert_eq!(out.steps, 10);
    assert_eq!(io.position(axis), Some(0));
    assert_eq!(io.writes_to(37), vec![false, false]);
}

#[test]
fn relay_axis_polls_at_its_own_interval() {
    let (io, mut m, _) = relay_rig_polling(100, 10, Some(1_000));
    m.go_until_limit(Direction::Up).expect("move");
    // ten reads, nine polls between them, then the debounce
    assert_eq!(io.clock().elapsed(), Duration::from_millis(9 + 150));
}

#[test]
fn transition_landing_on_the_boundary_spends_the_budget() {
    let io = sim();
    let mut cfg = small_cfg();
    cfg.run.strictness = Strictness::Strict;
    let (step, _) = first_driver(&cfg.vertical.drive);
    let axis = vertical_axis(&io, &cfg, 20, 10);
    let mut m = machine(&io, cfg);

    let out = m.transition(Direction::Down).expect("full gap");
    assert_eq!((out.steps, out.stop), (10, MoveStop::Budget));
    assert_eq!(rising_edges(&io, step), 10);
    assert_eq!(io.position(axis), Some(20));
    assert!(m.is_pressed(LimitSwitch::Bottom).expect("read"));
}

#[test]
fn relay_transition_landing_on_the_boundary_spends_the_budget() {
    let (io, mut m, axis) = relay_rig(18, 10);
    let out = m.transition(Direction::Down).expect("full gap");
    assert_eq!((out.steps, out.stop), (8, MoveStop::Budget));
    assert_eq!(io.position(axis), Some(18));
}

#[test]
fn back_off_frees_a_pressed_switch() {
    let io = sim();
    let cfg = small_cfg();
    let (step, _) = first_driver(&cfg.horizontal.drive);
    let axis = horizontal_axis(&io, &cfg, 30, 30);
    let mut m = machine(&io, cfg);

    assert_eq!(m.back_off(LimitSwitch::Right).expect("back off"), 1);
    assert_eq!(io.position(axis), Some(29));
    assert_eq!(rising_edges(&io, step), 1);
    assert!(!m.is_pressed(LimitSwitch::Right).expect("read"));
}

#[test]
fn relay_back_off_runs_until_the_switch_lets_go() {
    let (io, mut m, axis) = relay_rig(100, 100);
    assert_eq!(m.back_off(LimitSwitch::Bottom).expect("back off"), 1);
    assert_eq!(io.position(axis), Some(99));
    assert!(!io.level(36) && !io.level(37), "both relays released");
}

#[test]
fn back_off_gives_up_after_a_stroke_gap() {
    let io = sim();
    let cfg = small_cfg();
    let (step, _) = first_driver(&cfg.horizontal.drive);
    io.hold(cfg.pins.left_limit, true);
    let mut m = machine(&io, cfg);

    let err = m.back_off(LimitSwitch::Left).expect_err("switch stuck");
    assert_eq!(fault_reason(&err), Some(FaultReason::AlreadyPressed));
    assert_eq!(rising_edges(&io, step), 10);
}

#[test]
fn strict_transition_into_the_boundary_faults() {
    let io = sim();
    let mut cfg = small_cfg();
    cfg.run.strictness = Strictness::Strict;
    vertical_axis(&io, &cfg, 100, 95);
    let mut m = machine(&io, cfg);

    let err = m.transition(Direction::Down).expect_err("boundary inside gap");
    assert_eq!(
        fault_reason(&err),
        Some(FaultReason::BoundaryReachedMidTransition)
    );
}

#[test]
fn lenient_transition_into_the_boundary_is_cut_short() {
    let io = sim();
    let cfg = small_cfg();
    vertical_axis(&io, &cfg, 100, 95);
    let mut m = machine(&io, cfg);

    let out = m.transition(Direction::Down).expect("lenient");
    assert_eq!((out.steps, out.stop), (5, MoveStop::Limit));
}

#[test]
fn read_failure_surfaces_as_hardware_error() {
    let io = sim();
    let cfg = small_cfg();
    io.fail_reads(cfg.pins.left_limit);
    let mut m = machine(&io, cfg);

    let err = m.go_until_limit(Direction::Left).expect_err("read fails");
    let msg = format!("{err:#}");
    assert!(msg.contains("moving left"), "{msg}");
    assert!(msg.contains("hardware error"), "{msg}");
}
