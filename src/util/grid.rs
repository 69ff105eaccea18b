use serde::{Deserialize, Serialize};

/// Integer board coordinate, zero-indexed, y grows downward
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    /// Sentinel for a player that has not been placed on the board yet;
    /// spawn placement replaces it with a random unoccupied cell
    pub const UNPLACED: Coord = Coord { x: -1, y: -1 };

    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_unplaced(&self) -> bool {
        self.x < 0 || self.y < 0
    }

    /// The neighbouring cell one unit step away in `dir`
    #[inline]
    pub fn step(&self, dir: Direction) -> Coord {
        let (dx, dy) = dir.delta();
        Coord::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance: max(|dx|, |dy|).
    ///
    /// All rule-enforced range checks (attack, gift, vision) use this metric.
    #[inline]
    pub fn chebyshev(&self, other: Coord) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Euclidean distance, used only for rendering falloff, never for rules
    #[inline]
    pub fn euclidean(&self, other: Coord) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 8-way compass movement direction
///
/// Serialized names match the historical log format (`up`, `up_left`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    UpLeft,
    UpRight,
    Left,
    Right,
    Down,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::Left,
        Direction::Right,
        Direction::Down,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    /// Unit (dx, dy) step vector
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (1, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::DownLeft => (-1, 1),
            Direction::DownRight => (1, 1),
        }
    }
}
