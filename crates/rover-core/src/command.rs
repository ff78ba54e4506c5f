//! Direction intents and command token constants

use std::fmt;

/// Prefix of every command token
pub const COMMAND_PREFIX: &str = "CMD:";

/// Length of a command token in bytes (`CMD:` + one letter)
pub const COMMAND_TOKEN_LEN: usize = 5;

/// Movement direction
///
/// North/South move along latitude, East/West along longitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Wire letter
    #[inline]
    pub fn letter(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'E',
            Direction::West => 'W',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'N' => Some(Direction::North),
            'S' => Some(Direction::South),
            'E' => Some(Direction::East),
            'W' => Some(Direction::West),
            _ => None,
        }
    }

    /// Unit vector as (lat, lon) signs
    #[inline]
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::North => (1.0, 0.0),
            Direction::South => (-1.0, 0.0),
            Direction::East => (0.0, 1.0),
            Direction::West => (0.0, -1.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
