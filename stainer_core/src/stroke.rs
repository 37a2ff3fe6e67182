//! Stroke sequencing.
//!
//! An operator starts a stroke with a double tap on the stroke axis switches:
//!
//! - the same switch twice (`A, A`) ends the stroke at the other switch;
//! - one switch then the other twice (`A, B, B`) ends it back at `A`.
//!
//! Only fresh presses count. A driven stroke parks the head on its endpoint
//! switch, so the next stroke start first backs the head off it.

use eyre::WrapErr;
use stainer_traits::DigitalIo;
use tracing::{debug, info};

use crate::config::StrokeMode;
use crate::error::Result;
use crate::limits::{Axis, LimitSwitch, direction_for};
use crate::machine::Machine;
use crate::status::StrokeReport;

impl<I: DigitalIo> Machine<I> {
    /// Wait for a stroke start on `axis` and return the stroke endpoint.
    pub fn stroke_wait(&mut self, axis: Axis) -> Result<LimitSwitch> {
        let [a, b] = axis.limits();
        if self.cfg.run.stroke_mode == StrokeMode::Driven {
            // Both pressed is left to the press wait to judge.
            let resting = match (self.is_pressed(a)?, self.is_pressed(b)?) {
                (true, false) => Some(a),
                (false, true) => Some(b),
                _ => None,
            };
            if let Some(s) = resting {
                self.back_off(s)
                    .wrap_err_with(|| format!("freeing {s} for the next stroke"))?;
            }
        }
        // A tap may be over before its press debounce ends, so the releases
        // below carry no precondition.
        let first = self.wait_press_any_of_two(a, b)?;
        self.settle(first, false)?;
        let second = self.wait_press_any_of_two(a, b)?;
        let endpoint = if second == first {
            self.settle(first, false)?;
            first.other()
        } else {
            self.wait_second_release(second)?;
            first
        };
        debug!(%axis, %first, %second, %endpoint, "stroke start classified");
        Ok(endpoint)
    }

    /// One stroke on `axis`: wait for the start, spray toward the endpoint
    /// and count it.
    pub fn stroke(&mut self, axis: Axis) -> Result<StrokeReport> {
        self.turn_off_sprays()?;
        let endpoint = self.stroke_wait(axis)?;
        let spray = self.select_spray(axis)?;
        match self.cfg.run.stroke_mode {
            StrokeMode::Driven => {
                self.go_until_limit(direction_for(endpoint))?;
            }
            StrokeMode::Passive => self.wait_press(endpoint)?,
        }
        self.turn_off_sprays()?;
        let count = self.counters.increment(axis);
        info!(%axis, %endpoint, %spray, count, "stroke complete");
        Ok(StrokeReport {
            axis,
            endpoint,
            spray,
            count,
        })
    }
}
