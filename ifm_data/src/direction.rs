//! The twelve map directions.
//!
//! Cardinals and diagonals carry a unit grid offset; `Up`, `Down`, `In` and
//! `Out` exist only as travel verbs and have no offset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named direction a room exit or link segment can take.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    SouthWest,
    NorthWest,
    SouthEast,
    Up,
    Down,
    In,
    Out,
}

/// All directions, in declaration-table order.
pub const DIRECTIONS: [Direction; 12] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
    Direction::NorthEast,
    Direction::SouthWest,
    Direction::NorthWest,
    Direction::SouthEast,
    Direction::Up,
    Direction::Down,
    Direction::In,
    Direction::Out,
];

impl Direction {
    /// Unit grid offset, with north pointing towards positive y.
    /// Zero for the four directions that are off the map plane.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, 1),
            Direction::SouthWest => (-1, -1),
            Direction::NorthWest => (-1, 1),
            Direction::SouthEast => (1, -1),
            Direction::Up | Direction::Down | Direction::In | Direction::Out => (0, 0),
        }
    }

    /// The direction you face after turning around.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }

    /// The direction whose offset matches `(dx, dy)`, if any.
    ///
    /// Only the eight on-grid directions can match; `(0, 0)` and non-unit
    /// offsets return `None`.
    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        if dx == 0 && dy == 0 {
            return None;
        }
        DIRECTIONS.iter().copied().find(|d| d.offset() == (dx, dy))
    }

    /// Short name used as a default travel command ("N", "SE", "IN", ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
            Direction::NorthEast => "NE",
            Direction::SouthWest => "SW",
            Direction::NorthWest => "NW",
            Direction::SouthEast => "SE",
            Direction::Up => "U",
            Direction::Down => "D",
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }

    /// Long name used in diagnostics ("north", "southeast", ...).
    pub fn long_name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::NorthEast => "northeast",
            Direction::SouthWest => "southwest",
            Direction::NorthWest => "northwest",
            Direction::SouthEast => "southeast",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_trip_through_from_offset() {
        for dir in DIRECTIONS {
            let (dx, dy) = dir.offset();
            if (dx, dy) == (0, 0) {
                continue;
            }
            assert_eq!(Direction::from_offset(dx, dy), Some(dir));
        }
    }

    #[test]
    fn opposites_are_involutions() {
        for dir in DIRECTIONS {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn zero_offset_is_no_direction() {
        assert_eq!(Direction::from_offset(0, 0), None);
        assert_eq!(Direction::from_offset(2, 0), None);
    }
}
