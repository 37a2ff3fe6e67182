//! Pass controller: home, then stroke and step over until the far boundary.

use eyre::WrapErr;
use stainer_traits::DigitalIo;
use tracing::{debug, info, warn};

use crate::config::Strictness;
use crate::error::{FaultReason, Result, fault};
use crate::limits::{Direction, limit_for};
use crate::machine::Machine;
use crate::motion::StepBudget;
use crate::status::{MoveOutcome, MoveStop, PassReport, StrokeReport};

impl<I: DigitalIo> Machine<I> {
    /// Step `stroke_gap` toward `boundary` with the sprays off.
    ///
    /// Running out of budget is the normal end. Reaching the boundary first
    /// cuts the move short; strict rigs treat that as a fault.
    pub fn transition(&mut self, boundary: Direction) -> Result<MoveOutcome> {
        self.turn_off_sprays()?;
        let gap = self.cfg.axis(boundary.axis()).stroke_gap;
        let outcome = self.move_toward(boundary, StepBudget::AtMost(gap))?;
        self.turn_off_sprays()?;
        if outcome.stop == MoveStop::Limit {
            if self.cfg.run.strictness == Strictness::Strict {
                return Err(fault(FaultReason::BoundaryReachedMidTransition)).wrap_err_with(|| {
                    format!("{boundary} boundary after {} of {gap} steps", outcome.steps)
                });
            }
            warn!(%boundary, steps = outcome.steps, gap, "boundary reached mid-transition");
        }
        Ok(outcome)
    }

    /// Stroke on the perpendicular axis and transition toward `boundary`
    /// until its limit switch is pressed.
    pub fn do_strokes(&mut self, boundary: Direction) -> Result<Vec<StrokeReport>> {
        let stroke_axis = boundary.axis().perpendicular();
        let limit = limit_for(boundary);
        let mut strokes = Vec::new();
        while !self.is_pressed(limit)? {
            strokes.push(self.stroke(stroke_axis)?);
            self.transition(boundary)?;
        }
        debug!(%boundary, strokes = strokes.len(), "boundary reached");
        Ok(strokes)
    }

    /// Full pass: everything off, home toward `home`, engage the stroke
    /// motor and work toward the opposite boundary.
    pub fn run_pass(&mut self, home: Direction) -> Result<PassReport> {
        info!(%home, "pass starting");
        self.turn_off_all()?;
        self.go_until_limit(home)
            .wrap_err_with(|| format!("homing {home}"))?;
        self.select_induction(home.axis().perpendicular())?;
        let strokes = self.do_strokes(home.opposite())?;
        info!(%home, strokes = strokes.len(), "pass complete");
        Ok(PassReport { home, strokes })
    }
}
