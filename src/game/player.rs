//! Player entity: per-tank counters and the range-query helper.
//!
//! Rule-relevant fields are only mutated through the engine operations in
//! [`crate::game::engine`]; queries hand out clones, never live references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::util::grid::Coord;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Creation info for one player, supplied by the command layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Display name
    pub name: String,
    /// URL to the display icon, opaque to the engine
    pub icon: String,
    /// External identity (e.g. a chat-platform user id)
    pub user_id: String,
}

/// A tank on the board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    /// External identity reference, opaque to the engine
    pub user_id: String,
    pub name: String,
    pub icon: String,
    /// Board position; in-bounds once spawned
    pub coords: Coord,
    /// Action points, spent on moves, attacks and range upgrades
    pub points: u32,
    /// Action radius in Chebyshev distance; never decreases
    pub range: u32,
    /// Remaining lives; 0 = eliminated, permanently
    pub lives: u32,
    pub kills: u32,
}

impl Player {
    pub(crate) fn new(spec: PlayerSpec, coords: Coord, config: &GameConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: spec.user_id,
            name: spec.name,
            icon: spec.icon,
            coords,
            points: config.starting_points,
            range: config.starting_range,
            lives: config.starting_lives,
            kills: 0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    /// Chebyshev range test used for attack and gift eligibility (inclusive)
    #[inline]
    pub fn in_range_of(&self, coords: Coord) -> bool {
        self.coords.chebyshev(coords) <= self.range
    }

    pub(crate) fn add_points(&mut self, amount: u32) {
        self.points += amount;
    }

    /// Clamped at zero; point-consuming validation happens before this
    pub(crate) fn remove_points(&mut self, amount: u32) {
        self.points = self.points.saturating_sub(amount);
    }

    /// Lose exactly one life; returns the new total
    pub(crate) fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub(crate) fn add_kill(&mut self) {
        self.kills += 1;
    }

    /// Range grows by exactly 1. The 2-point cost is charged by the engine
    /// in the same operation; the two effects are never applied separately.
    pub(crate) fn increase_range(&mut self) {
        self.range += 1;
    }
}
