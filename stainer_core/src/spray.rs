//! Spray valve policy.

use std::fmt;

use stainer_traits::DigitalIo;
use tracing::debug;

use crate::config::SprayThresholds;
use crate::error::Result;
use crate::limits::Axis;
use crate::machine::Machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprayConfiguration {
    TopOnly,
    BottomOnly,
    Both,
    Off,
}

impl SprayConfiguration {
    /// Valve levels as `(top, bottom)`.
    pub fn valves(self) -> (bool, bool) {
        match self {
            SprayConfiguration::TopOnly => (true, false),
            SprayConfiguration::BottomOnly => (false, true),
            SprayConfiguration::Both => (true, true),
            SprayConfiguration::Off => (false, false),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SprayConfiguration::TopOnly => "top-only",
            SprayConfiguration::BottomOnly => "bottom-only",
            SprayConfiguration::Both => "both",
            SprayConfiguration::Off => "off",
        }
    }
}

impl fmt::Display for SprayConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Valve combination for a stroke that starts with `stroke_count` strokes
/// already done on its axis.
pub fn select_spray(stroke_count: u32, t: &SprayThresholds) -> SprayConfiguration {
    if stroke_count < t.min {
        SprayConfiguration::TopOnly
    } else if stroke_count <= t.max {
        SprayConfiguration::Both
    } else {
        SprayConfiguration::BottomOnly
    }
}

impl<I: DigitalIo> Machine<I> {
    pub fn apply_spray(&mut self, spray: SprayConfiguration) -> Result<()> {
        let (top, bottom) = spray.valves();
        self.write(self.cfg.pins.top_spray, top)?;
        self.write(self.cfg.pins.bottom_spray, bottom)?;
        debug!(%spray, "sprays set");
        Ok(())
    }

    /// Select the spray for the next stroke on `axis` and open the valves.
    pub fn select_spray(&mut self, axis: Axis) -> Result<SprayConfiguration> {
        let spray = select_spray(self.counters.get(axis), &self.cfg.spray);
        self.apply_spray(spray)?;
        Ok(spray)
    }

    pub fn turn_off_sprays(&mut self) -> Result<()> {
        self.apply_spray(SprayConfiguration::Off)
    }
}
