//! Game state: board, roster, phase and the append-only log.
//!
//! The roster is fixed at creation: players are never removed, elimination is
//! a lives counter hitting zero. All rule enforcement lives in
//! [`crate::game::engine`]; this module owns storage, spawn placement and the
//! read-only queries used by external collaborators.

use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::engine::GameError;
use crate::game::events::{EventBus, GameEvent};
use crate::game::persist::{GameRecord, PersistError};
use crate::game::player::{Player, PlayerId, PlayerSpec};
use crate::util::grid::Coord;

/// Current milliseconds since the Unix epoch
pub(crate) fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Two-state machine; `Ended` is terminal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Ongoing,
    Ended,
}

/// Query result annotated with both distance metrics.
///
/// Rules use Chebyshev exclusively; the Euclidean distance is for the
/// renderer's visual falloff.
#[derive(Debug, Clone)]
pub struct RangedPlayer {
    pub player: Player,
    pub euclidean: f64,
    pub chebyshev: u32,
}

/// A single Tank Tactics match
#[derive(Debug)]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    pub(crate) board_width: u32,
    pub(crate) board_height: u32,
    /// Milliseconds between periodic action point drops
    pub(crate) gift_round_interval: u64,
    /// Wall-clock timestamp (ms) of the last drop
    pub(crate) last_gift_round: u64,
    pub(crate) phase: GamePhase,
    /// Insertion-ordered; membership never changes after creation
    pub(crate) players: Vec<Player>,
    pub(crate) index: HashMap<PlayerId, usize>,
    pub(crate) log: Vec<GameEvent>,
    pub(crate) bus: EventBus,
}

impl Game {
    /// Create a game, spawning every player at a random unoccupied cell.
    ///
    /// Board dimensions derive from the player count unless the config pins
    /// them explicitly. Fails with `BoardTooSmall` when an explicit board
    /// cannot hold the roster.
    pub fn new(
        name: String,
        specs: Vec<PlayerSpec>,
        config: &GameConfig,
    ) -> Result<Self, GameError> {
        let count = specs.len() as u32;
        let board_width = config
            .board_width
            .unwrap_or(config.board_width_per_player * count);
        let board_height = config
            .board_height
            .unwrap_or(config.board_height_per_player * count);

        let mut rng = rand::thread_rng();
        let mut players: Vec<Player> = Vec::with_capacity(specs.len());
        for spec in specs {
            let occupied: Vec<Coord> = players.iter().map(|p| p.coords).collect();
            let coords = spawn_coord(&mut rng, board_width, board_height, &occupied)
                .ok_or(GameError::BoardTooSmall)?;
            players.push(Player::new(spec, coords, config));
        }
        let index = players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let id = Uuid::new_v4();
        info!(
            game = %id,
            players = players.len(),
            board = format!("{}x{}", board_width, board_height),
            "game created"
        );

        Ok(Self {
            id,
            name,
            board_width,
            board_height,
            gift_round_interval: config.gift_round_interval,
            last_gift_round: unix_ms(),
            phase: GamePhase::Ongoing,
            players,
            index,
            log: Vec::new(),
            bus: EventBus::new(),
        })
    }

    /// Rebuild a game from a persisted record. Lossless inverse of
    /// [`Game::snapshot`] for all valid records.
    ///
    /// Sentinel `(-1,-1)` coordinates get a fresh spawn; anything else must
    /// already satisfy the board invariants.
    pub fn restore(record: GameRecord) -> Result<Self, PersistError> {
        if record.board_width == 0 || record.board_height == 0 {
            return Err(PersistError::InvalidRecord(
                "board dimensions must be positive".to_string(),
            ));
        }
        if record.players.is_empty() {
            return Err(PersistError::InvalidRecord("empty roster".to_string()));
        }
        // An ongoing game always has at least two living players; the win
        // check ends it the moment the count drops to one. A record claiming
        // otherwise would restore as unwinnable.
        let living = record.players.iter().filter(|p| p.is_alive()).count();
        if record.phase == GamePhase::Ongoing && living < 2 {
            return Err(PersistError::InvalidRecord(format!(
                "ongoing game with {} living players",
                living
            )));
        }

        let (width, height) = (record.board_width, record.board_height);
        let mut rng = rand::thread_rng();
        let mut players: Vec<Player> = Vec::with_capacity(record.players.len());
        let mut index = HashMap::with_capacity(record.players.len());

        for (i, mut player) in record.players.into_iter().enumerate() {
            if player.coords.is_unplaced() {
                let occupied: Vec<Coord> = players
                    .iter()
                    .filter(|p| p.is_alive())
                    .map(|p| p.coords)
                    .collect();
                player.coords = spawn_coord(&mut rng, width, height, &occupied).ok_or_else(
                    || {
                        PersistError::InvalidRecord(format!(
                            "no free cell to respawn player {}",
                            player.id
                        ))
                    },
                )?;
            } else if !cell_in_bounds(width, height, player.coords) {
                return Err(PersistError::InvalidRecord(format!(
                    "player {} is out of bounds at ({}, {})",
                    player.id, player.coords.x, player.coords.y
                )));
            }
            if player.is_alive()
                && players
                    .iter()
                    .any(|p| p.is_alive() && p.coords == player.coords)
            {
                return Err(PersistError::InvalidRecord(format!(
                    "living players overlap at ({}, {})",
                    player.coords.x, player.coords.y
                )));
            }
            if index.insert(player.id, i).is_some() {
                return Err(PersistError::InvalidRecord(format!(
                    "duplicate player id {}",
                    player.id
                )));
            }
            players.push(player);
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            board_width: width,
            board_height: height,
            gift_round_interval: record.gift_round_interval,
            last_gift_round: record.last_gift_round,
            phase: record.phase,
            players,
            index,
            log: record.log,
            bus: EventBus::new(),
        })
    }

    /// Plain record carrying every persisted field, including the log
    pub fn snapshot(&self) -> GameRecord {
        GameRecord {
            id: self.id,
            name: self.name.clone(),
            board_width: self.board_width,
            board_height: self.board_height,
            last_gift_round: self.last_gift_round,
            gift_round_interval: self.gift_round_interval,
            phase: self.phase,
            players: self.players.clone(),
            log: self.log.clone(),
        }
    }

    pub fn board_width(&self) -> u32 {
        self.board_width
    }

    pub fn board_height(&self) -> u32 {
        self.board_height
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    pub fn gift_round_interval(&self) -> u64 {
        self.gift_round_interval
    }

    pub fn last_gift_round(&self) -> u64 {
        self.last_gift_round
    }

    /// Earliest wall-clock instant (ms) at which the next drop is due
    pub fn next_drop_at(&self) -> u64 {
        self.last_gift_round.saturating_add(self.gift_round_interval)
    }

    pub fn drop_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_drop_at()
    }

    /// Append-only; ordered by occurrence
    pub fn log(&self) -> &[GameEvent] {
        &self.log
    }

    /// Register an external subscriber (persistence, renderer, notifier)
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<GameEvent> {
        self.bus.subscribe()
    }

    /// Read-only roster view in insertion order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.index.get(&id).map(|&i| &self.players[i])
    }

    pub fn find_by_user_id(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive()).count()
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let i = *self.index.get(&id)?;
        Some(&mut self.players[i])
    }

    /// Append to the log (unless notification-only) and publish to subscribers
    pub(crate) fn record(&mut self, event: GameEvent) {
        if event.is_loggable() {
            self.log.push(event.clone());
        }
        self.bus.publish(&event);
    }

    pub(crate) fn in_bounds(&self, coords: Coord) -> bool {
        cell_in_bounds(self.board_width, self.board_height, coords)
    }

    /// Occupancy counts living players only; the dead don't block cells
    pub(crate) fn is_occupied(&self, coords: Coord) -> bool {
        self.players
            .iter()
            .any(|p| p.is_alive() && p.coords == coords)
    }

    /// All living players ordered by ascending Euclidean distance from
    /// `(x, y)`; stable sort keeps insertion order for equal distances.
    pub fn closest_players(&self, x: i32, y: i32) -> Vec<RangedPlayer> {
        let origin = Coord::new(x, y);
        let mut out: Vec<RangedPlayer> = self
            .alive_players()
            .map(|p| RangedPlayer {
                euclidean: p.coords.euclidean(origin),
                chebyshev: p.coords.chebyshev(origin),
                player: p.clone(),
            })
            .collect();
        out.sort_by(|a, b| {
            a.euclidean
                .partial_cmp(&b.euclidean)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Living players, excluding the subject, within the subject's Chebyshev
    /// range. Callers use this to pre-filter attack and gift targets.
    pub fn players_in_range(&self, id: PlayerId) -> Result<Vec<Player>, GameError> {
        let subject = self.get_player(id).ok_or(GameError::NotFound)?;
        Ok(self
            .alive_players()
            .filter(|p| p.id != id && subject.in_range_of(p.coords))
            .cloned()
            .collect())
    }
}

fn cell_in_bounds(width: u32, height: u32, coords: Coord) -> bool {
    coords.x >= 0
        && coords.y >= 0
        && (coords.x as u32) < width
        && (coords.y as u32) < height
}

/// Pick a random free cell, or `None` when the board is full.
///
/// Rejection sampling almost always succeeds on the first draw (15 cells per
/// player at default scaling); a dense board falls back to drawing from the
/// explicit free-cell list so placement always terminates.
fn spawn_coord<R: Rng>(rng: &mut R, width: u32, height: u32, occupied: &[Coord]) -> Option<Coord> {
    if width == 0 || height == 0 {
        return None;
    }
    for _ in 0..32 {
        let candidate = Coord::new(
            rng.gen_range(0..width as i32),
            rng.gen_range(0..height as i32),
        );
        if !occupied.contains(&candidate) {
            return Some(candidate);
        }
    }

    let free: Vec<Coord> = (0..height as i32)
        .flat_map(|y| (0..width as i32).map(move |x| Coord::new(x, y)))
        .filter(|c| !occupied.contains(c))
        .collect();
    if free.is_empty() {
        None
    } else {
        Some(free[rng.gen_range(0..free.len())])
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{game_at, ids};
    use super::*;

    fn specs(n: usize) -> Vec<PlayerSpec> {
        (0..n)
            .map(|i| PlayerSpec {
                name: format!("P{}", i + 1),
                icon: String::new(),
                user_id: format!("user-{}", i + 1),
            })
            .collect()
    }

    #[test]
    fn test_board_derived_from_player_count() {
        let game = Game::new("g".to_string(), specs(3), &GameConfig::default()).unwrap();
        assert_eq!(game.board_width(), 15);
        assert_eq!(game.board_height(), 9);
    }

    #[test]
    fn test_explicit_board_overrides_derivation() {
        let config = GameConfig {
            board_width: Some(40),
            board_height: Some(20),
            ..GameConfig::default()
        };
        let game = Game::new("g".to_string(), specs(3), &config).unwrap();
        assert_eq!(game.board_width(), 40);
        assert_eq!(game.board_height(), 20);
    }

    #[test]
    fn test_new_rejects_board_smaller_than_roster() {
        let config = GameConfig {
            board_width: Some(1),
            board_height: Some(2),
            ..GameConfig::default()
        };
        assert_eq!(
            Game::new("g".to_string(), specs(3), &config).err(),
            Some(GameError::BoardTooSmall)
        );
    }

    #[test]
    fn test_new_fills_a_board_with_no_spare_cells() {
        // 2x2 board, 4 players: every cell taken, placement must still finish
        let config = GameConfig {
            board_width: Some(2),
            board_height: Some(2),
            ..GameConfig::default()
        };
        for _ in 0..20 {
            let game = Game::new("g".to_string(), specs(4), &config).unwrap();
            let mut coords: Vec<Coord> = game.players().map(|p| p.coords).collect();
            coords.sort_by_key(|c| (c.x, c.y));
            coords.dedup();
            assert_eq!(coords.len(), 4);
        }
    }

    #[test]
    fn test_spawns_in_bounds_and_unique() {
        for _ in 0..20 {
            let game = Game::new("g".to_string(), specs(6), &GameConfig::default()).unwrap();
            for p in game.players() {
                assert!(game.in_bounds(p.coords), "spawn out of bounds: {:?}", p.coords);
            }
            let mut coords: Vec<Coord> = game.players().map(|p| p.coords).collect();
            coords.sort_by_key(|c| (c.x, c.y));
            coords.dedup();
            assert_eq!(coords.len(), 6, "players spawned on the same cell");
        }
    }

    #[test]
    fn test_roster_is_insertion_ordered_and_indexed() {
        let game = Game::new("g".to_string(), specs(4), &GameConfig::default()).unwrap();
        assert_eq!(game.player_count(), 4);
        let names: Vec<&str> = game.players().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["P1", "P2", "P3", "P4"]);
        for p in game.players() {
            assert_eq!(game.get_player(p.id).map(|q| q.id), Some(p.id));
        }
        assert!(game.find_by_user_id("user-2").is_some());
        assert!(game.find_by_user_id("stranger").is_none());
    }

    #[test]
    fn test_closest_players_ordering_and_annotations() {
        let game = game_at(&[(0, 0), (3, 4), (1, 0)]);
        let ranked = game.closest_players(0, 0);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].player.name, "P1");
        assert_eq!(ranked[0].euclidean, 0.0);
        assert_eq!(ranked[1].player.name, "P3");
        assert_eq!(ranked[2].player.name, "P2");
        assert!((ranked[2].euclidean - 5.0).abs() < 1e-9);
        assert_eq!(ranked[2].chebyshev, 4);
    }

    #[test]
    fn test_closest_players_tie_break_is_insertion_order() {
        // P1 and P2 are equidistant from the origin
        let game = game_at(&[(2, 0), (0, 2), (5, 5)]);
        let ranked = game.closest_players(0, 0);
        assert_eq!(ranked[0].player.name, "P1");
        assert_eq!(ranked[1].player.name, "P2");
    }

    #[test]
    fn test_closest_players_skips_dead() {
        let mut game = game_at(&[(0, 0), (1, 1)]);
        game.players[0].lives = 0;
        let ranked = game.closest_players(0, 0);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].player.name, "P2");
    }

    #[test]
    fn test_players_in_range_excludes_self_and_dead() {
        let mut game = game_at(&[(5, 5), (6, 6), (7, 7), (15, 10)]);
        let ids = ids(&game);
        game.players[2].lives = 0;

        let targets = game.players_in_range(ids[0]).unwrap();
        // P2 at Chebyshev 1 is in; P3 is dead; P4 is far out; self excluded
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, ids[1]);
    }

    #[test]
    fn test_players_in_range_unknown_id() {
        let game = game_at(&[(0, 0), (1, 1)]);
        assert_eq!(
            game.players_in_range(Uuid::new_v4()),
            Err(GameError::NotFound)
        );
    }

    #[test]
    fn test_occupancy_ignores_dead() {
        let mut game = game_at(&[(2, 2), (4, 4)]);
        assert!(game.is_occupied(Coord::new(2, 2)));
        game.players[0].lives = 0;
        assert!(!game.is_occupied(Coord::new(2, 2)));
    }

    #[test]
    fn test_drop_due_timing() {
        let mut game = game_at(&[(0, 0), (5, 5)]);
        game.gift_round_interval = 600_000;
        game.last_gift_round = 1_000_000;
        assert!(!game.drop_due(1_000_000));
        assert!(!game.drop_due(1_599_999));
        assert!(game.drop_due(1_600_000));
        assert_eq!(game.next_drop_at(), 1_600_000);
    }

    #[test]
    fn test_next_drop_at_saturates_on_huge_timestamps() {
        let mut game = game_at(&[(0, 0), (5, 5)]);
        game.last_gift_round = u64::MAX;
        assert_eq!(game.next_drop_at(), u64::MAX);
        assert!(!game.drop_due(0));
    }
}
