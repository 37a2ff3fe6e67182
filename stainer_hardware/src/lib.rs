//! I/O backends for the staining controller.
//!
//! - [`SimulatedIo`]: a deterministic simulated rig for tests and `stainer simulate`.
//! - `gpio::GpioIo`: Raspberry Pi GPIO via rppal (feature `hardware`).
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use sim::{PinWrite, SimAxis, SimDrive, SimulatedIo};

/// Internal resistor on the limit inputs. An open switch must read released,
/// so the bias pulls toward the inactive level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBias {
    PullUp,
    PullDown,
}

impl InputBias {
    pub fn for_active_low(active_low: bool) -> Self {
        if active_low { Self::PullUp } else { Self::PullDown }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stainer_traits::{Clock, DigitalIo, StepCounter, VirtualClock};
    use std::time::Duration;

    #[test]
    fn scripted_switch_follows_virtual_time() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock.clone());
        io.script(5, &[(100, true), (300, false)]);
        assert!(!io.read_pin(5).unwrap());
        clock.sleep(Duration::from_millis(100));
        assert!(io.read_pin(5).unwrap());
        clock.sleep(Duration::from_millis(200));
        assert!(!io.read_pin(5).unwrap());
    }

    #[test]
    fn stepper_axis_moves_on_rising_edges_and_presses_limits() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock);
        let axis = io.add_axis(SimAxis {
            drive: SimDrive::Stepper {
                step: 24,
                dir: 23,
                increasing_level: false,
            },
            min_limit: 41,
            max_limit: 38,
            length: 3,
            position: 1,
        });
        // dir high moves toward min
        io.write_pin(23, true).unwrap();
        io.write_pin(24, true).unwrap();
        io.write_pin(24, true).unwrap(); // not an edge
        io.write_pin(24, false).unwrap();
        assert_eq!(io.position(axis), Some(0));
        assert!(io.read_pin(41).unwrap());
        assert!(!io.read_pin(38).unwrap());
    }

    #[test]
    fn relay_axis_moves_per_read_and_pulses_counter() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock);
        let counter = StepCounter::new();
        let axis = io.add_axis(SimAxis {
            drive: SimDrive::Relay {
                increase: 36,
                decrease: 7,
                counter: Some(counter.clone()),
            },
            min_limit: 42,
            max_limit: 39,
            length: 10,
            position: 8,
        });
        io.write_pin(36, true).unwrap();
        for _ in 0..5 {
            io.read_pin(39).unwrap();
        }
        assert_eq!(io.position(axis), Some(10));
        // clamped at the end stop: only two real moves were counted
        assert_eq!(counter.count(), 2);
        assert!(io.read_pin(39).unwrap());
    }

    #[test]
    fn taps_wait_for_an_idle_controller() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock.clone());
        io.queue_taps(
            &[41],
            Duration::from_millis(100),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        // not idle long enough yet
        assert!(!io.read_pin(41).unwrap());
        clock.sleep(Duration::from_millis(50));
        // this poll starts the tap, the next one sees it
        assert!(!io.read_pin(41).unwrap());
        assert_eq!(io.pending_taps(), 0);
        clock.sleep(Duration::from_millis(1));
        assert!(io.read_pin(41).unwrap());
        clock.sleep(Duration::from_millis(100));
        assert!(!io.read_pin(41).unwrap());
    }

    #[test]
    fn active_low_inverts_switch_levels_only() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock);
        io.set_limits_active_low(true);
        io.hold(5, false);
        assert!(io.read_pin(5).unwrap());
        io.write_pin(13, true).unwrap();
        assert!(io.read_pin(13).unwrap());
    }

    #[test]
    fn running_induction_motor_masks_axis_limits() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock);
        let axis = io.add_axis(SimAxis {
            drive: SimDrive::Stepper {
                step: 24,
                dir: 23,
                increasing_level: false,
            },
            min_limit: 41,
            max_limit: 38,
            length: 10,
            position: 10,
        });
        io.add_induction(11, 10, axis);
        assert!(io.read_pin(38).unwrap());
        io.write_pin(10, true).unwrap();
        io.write_pin(11, true).unwrap();
        assert!(!io.read_pin(38).unwrap());
        io.write_pin(11, false).unwrap();
        assert!(io.read_pin(38).unwrap());
    }

    #[test]
    fn open_switches_are_biased_to_released() {
        assert_eq!(InputBias::for_active_low(true), InputBias::PullUp);
        assert_eq!(InputBias::for_active_low(false), InputBias::PullDown);
    }

    #[test]
    fn failing_pin_reports_hardware_error() {
        let clock = VirtualClock::new();
        let mut io = SimulatedIo::new(clock);
        io.fail_reads(4);
        let err = io.read_pin(4).expect_err("read should fail");
        assert!(err.to_string().contains("gpio error"));
    }
}
