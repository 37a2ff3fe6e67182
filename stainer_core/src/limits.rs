//! Directions, limit switches and the mapping between them.

use std::fmt;

use crate::error::{FaultReason, StainerError, fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// The two switches bounding travel on this axis.
    pub fn limits(self) -> [LimitSwitch; 2] {
        match self {
            Axis::Horizontal => [LimitSwitch::Left, LimitSwitch::Right],
            Axis::Vertical => [LimitSwitch::Top, LimitSwitch::Bottom],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Vertical,
            Direction::Left | Direction::Right => Axis::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Firmware direction code: 0 up, 1 down, 2 left, 3 right.
    pub fn code(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Decode a firmware direction code. Anything outside 0..=3 is a fault.
    pub fn from_code(code: u8) -> crate::error::Result<Direction> {
        Direction::try_from(code).map_err(|_| fault(FaultReason::UnknownDirection(code)))
    }
}

impl TryFrom<u8> for Direction {
    type Error = StainerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            other => Err(StainerError::Fault(FaultReason::UnknownDirection(other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitSwitch {
    Top,
    Bottom,
    Left,
    Right,
}

impl LimitSwitch {
    pub const ALL: [LimitSwitch; 4] = [
        LimitSwitch::Top,
        LimitSwitch::Bottom,
        LimitSwitch::Left,
        LimitSwitch::Right,
    ];

    pub fn axis(self) -> Axis {
        direction_for(self).axis()
    }

    /// The switch at the other end of the same axis.
    pub fn other(self) -> LimitSwitch {
        limit_for(direction_for(self).opposite())
    }

    pub fn name(self) -> &'static str {
        match self {
            LimitSwitch::Top => "top",
            LimitSwitch::Bottom => "bottom",
            LimitSwitch::Left => "left",
            LimitSwitch::Right => "right",
        }
    }

    /// How operators name the extreme this switch guards.
    pub fn extreme_name(self) -> &'static str {
        match self {
            LimitSwitch::Top => "top",
            LimitSwitch::Bottom => "bottom",
            LimitSwitch::Left => "leftmost",
            LimitSwitch::Right => "rightmost",
        }
    }
}

impl fmt::Display for LimitSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Switch that trips when travelling in `direction`.
pub fn limit_for(direction: Direction) -> LimitSwitch {
    match direction {
        Direction::Up => LimitSwitch::Top,
        Direction::Down => LimitSwitch::Bottom,
        Direction::Left => LimitSwitch::Left,
        Direction::Right => LimitSwitch::Right,
    }
}

/// Direction of travel that ends at `switch`.
pub fn direction_for(switch: LimitSwitch) -> Direction {
    match switch {
        LimitSwitch::Top => Direction::Up,
        LimitSwitch::Bottom => Direction::Down,
        LimitSwitch::Left => Direction::Left,
        LimitSwitch::Right => Direction::Right,
    }
}

impl From<stainer_config::DirectionName> for Direction {
    fn from(d: stainer_config::DirectionName) -> Self {
        use stainer_config::DirectionName as N;
        match d {
            N::Up => Direction::Up,
            N::Down => Direction::Down,
            N::Left => Direction::Left,
            N::Right => Direction::Right,
        }
    }
}

impl From<stainer_config::SwitchName> for LimitSwitch {
    fn from(s: stainer_config::SwitchName) -> Self {
        use stainer_config::SwitchName as N;
        match s {
            N::Top => LimitSwitch::Top,
            N::Bottom => LimitSwitch::Bottom,
            N::Left => LimitSwitch::Left,
            N::Right => LimitSwitch::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_stays_on_axis() {
        for s in LimitSwitch::ALL {
            assert_eq!(s.other().axis(), s.axis());
            assert_ne!(s.other(), s);
            assert_eq!(s.other().other(), s);
        }
    }

    #[test]
    fn codes_round_trip_and_reject_unknown() {
        for d in Direction::ALL {
            assert_eq!(Direction::try_from(d.code()).ok(), Some(d));
        }
        assert!(matches!(
            Direction::try_from(4),
            Err(StainerError::Fault(FaultReason::UnknownDirection(4)))
        ));
    }
}
