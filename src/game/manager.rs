//! Game registry: creates, restores, looks up and shuts down running games.
//!
//! Each registered game carries its own drop scheduler; the manager is how
//! the command layer resolves "which game does this user belong to".

use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::persist::GameRecord;
use crate::game::player::PlayerSpec;
use crate::game::scheduler::DropScheduler;
use crate::game::state::Game;

/// Minimum roster size for a well-defined match
pub const MIN_PLAYERS: usize = 2;

/// A registered game plus its drop timer
pub struct GameHandle {
    pub game: Arc<RwLock<Game>>,
    scheduler: DropScheduler,
    /// External identities of the roster, kept here so removal never needs
    /// to take the game lock
    users: Vec<String>,
}

/// Registry of running games
pub struct GameManager {
    games: HashMap<Uuid, GameHandle>,
    user_games: HashMap<String, Uuid>,
    max_games: usize,
    config: GameConfig,
}

impl GameManager {
    pub fn new(config: GameConfig, max_games: usize) -> Self {
        Self {
            games: HashMap::new(),
            user_games: HashMap::new(),
            max_games,
            config,
        }
    }

    /// Create a game and spawn its drop scheduler.
    ///
    /// Every player must be free: one running game per external user.
    pub fn create_game(
        &mut self,
        name: String,
        specs: Vec<PlayerSpec>,
    ) -> Result<Uuid, ManagerError> {
        if self.games.len() >= self.max_games {
            return Err(ManagerError::TooManyGames);
        }
        if specs.len() < MIN_PLAYERS {
            return Err(ManagerError::NotEnoughPlayers);
        }
        for spec in &specs {
            if self.user_games.contains_key(&spec.user_id) {
                return Err(ManagerError::AlreadyInGame);
            }
        }

        let game = Game::new(name, specs, &self.config)
            .map_err(|_| ManagerError::BoardTooSmall)?;
        Ok(self.register(game))
    }

    /// Re-register a persisted game, e.g. at process startup. The scheduler
    /// exits immediately for records that are already ended.
    pub fn restore_game(&mut self, record: GameRecord) -> Result<Uuid, ManagerError> {
        if self.games.len() >= self.max_games {
            return Err(ManagerError::TooManyGames);
        }
        let game = Game::restore(record).map_err(|e| ManagerError::BadRecord(e.to_string()))?;
        for p in game.players() {
            if self.user_games.contains_key(&p.user_id) {
                return Err(ManagerError::AlreadyInGame);
            }
        }
        Ok(self.register(game))
    }

    fn register(&mut self, game: Game) -> Uuid {
        let id = game.id;
        let users: Vec<String> = game.players().map(|p| p.user_id.clone()).collect();
        for user in &users {
            self.user_games.insert(user.clone(), id);
        }
        let game = Arc::new(RwLock::new(game));
        let scheduler = DropScheduler::spawn(game.clone());
        self.games.insert(
            id,
            GameHandle {
                game,
                scheduler,
                users,
            },
        );
        info!(game = %id, "game registered");
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<RwLock<Game>>> {
        self.games.get(&id).map(|h| h.game.clone())
    }

    /// Resolve the game an external user is playing in
    pub fn game_for_user(&self, user_id: &str) -> Option<Arc<RwLock<Game>>> {
        self.user_games
            .get(user_id)
            .and_then(|id| self.get(*id))
    }

    /// Register an event subscriber on a game
    pub async fn subscribe(
        &self,
        id: Uuid,
    ) -> Result<crossbeam_channel::Receiver<crate::game::events::GameEvent>, ManagerError> {
        let handle = self.games.get(&id).ok_or(ManagerError::GameNotFound)?;
        Ok(handle.game.write().await.subscribe())
    }

    /// Unregister a game, stopping its scheduler and freeing its players
    pub fn remove_game(&mut self, id: Uuid) -> Result<(), ManagerError> {
        let handle = self.games.remove(&id).ok_or(ManagerError::GameNotFound)?;
        handle.scheduler.stop();
        for user in &handle.users {
            self.user_games.remove(user);
        }
        info!(game = %id, "game removed");
        Ok(())
    }

    /// Stop every scheduler; registered games stay readable. Idempotent.
    pub fn shutdown_all(&self) {
        for handle in self.games.values() {
            handle.scheduler.stop();
        }
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ManagerError {
    #[error("Too many games")]
    TooManyGames,
    #[error("Not enough players")]
    NotEnoughPlayers,
    #[error("Configured board is too small for the roster")]
    BoardTooSmall,
    #[error("Game not found")]
    GameNotFound,
    #[error("Player is already in a game")]
    AlreadyInGame,
    #[error("Invalid game record: {0}")]
    BadRecord(String),
}

#[cfg(test)]
mod tests {
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

    fn manager() -> GameManager {
        GameManager::new(GameConfig::default(), 8)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let mut mgr = manager();
        let id = mgr.create_game("g1".to_string(), specs(3)).unwrap();

        assert_eq!(mgr.game_count(), 1);
        assert!(mgr.get(id).is_some());
        let game = mgr.game_for_user("user-2").unwrap();
        assert_eq!(game.read().await.id, id);
        assert!(mgr.game_for_user("stranger").is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_tiny_roster() {
        let mut mgr = manager();
        let result = mgr.create_game("g1".to_string(), specs(1));
        assert!(matches!(result, Err(ManagerError::NotEnoughPlayers)));
    }

    #[tokio::test]
    async fn test_create_rejects_undersized_board() {
        let config = GameConfig {
            board_width: Some(1),
            board_height: Some(1),
            ..GameConfig::default()
        };
        let mut mgr = GameManager::new(config, 8);
        let result = mgr.create_game("g1".to_string(), specs(2));
        assert!(matches!(result, Err(ManagerError::BoardTooSmall)));
        assert_eq!(mgr.game_count(), 0);
        assert!(mgr.game_for_user("user-1").is_none());
    }

    #[tokio::test]
    async fn test_one_game_per_user() {
        let mut mgr = manager();
        mgr.create_game("g1".to_string(), specs(3)).unwrap();
        let result = mgr.create_game("g2".to_string(), specs(3));
        assert!(matches!(result, Err(ManagerError::AlreadyInGame)));
    }

    #[tokio::test]
    async fn test_max_games_cap() {
        let mut mgr = GameManager::new(GameConfig::default(), 1);
        mgr.create_game("g1".to_string(), specs(2)).unwrap();

        let more = (0..2)
            .map(|i| PlayerSpec {
                name: format!("Q{}", i),
                icon: String::new(),
                user_id: format!("other-{}", i),
            })
            .collect();
        let result = mgr.create_game("g2".to_string(), more);
        assert!(matches!(result, Err(ManagerError::TooManyGames)));
    }

    #[tokio::test]
    async fn test_remove_frees_users() {
        let mut mgr = manager();
        let id = mgr.create_game("g1".to_string(), specs(3)).unwrap();
        mgr.remove_game(id).unwrap();

        assert_eq!(mgr.game_count(), 0);
        assert!(mgr.game_for_user("user-1").is_none());
        // The same users can start a fresh game
        assert!(mgr.create_game("g2".to_string(), specs(3)).is_ok());
    }

    #[tokio::test]
    async fn test_remove_unknown_game() {
        let mut mgr = manager();
        assert!(matches!(
            mgr.remove_game(Uuid::new_v4()),
            Err(ManagerError::GameNotFound)
        ));
    }

    #[tokio::test]
    async fn test_restore_round_trip_through_manager() {
        let mut mgr = manager();
        let id = mgr.create_game("g1".to_string(), specs(3)).unwrap();
        let record = mgr.get(id).unwrap().read().await.snapshot();
        mgr.remove_game(id).unwrap();

        let restored_id = mgr.restore_game(record).unwrap();
        assert_eq!(restored_id, id);
        assert!(mgr.game_for_user("user-3").is_some());
    }

    #[tokio::test]
    async fn test_restore_rejects_bad_record() {
        let mut mgr = manager();
        let id = mgr.create_game("g1".to_string(), specs(2)).unwrap();
        let mut record = mgr.get(id).unwrap().read().await.snapshot();
        mgr.remove_game(id).unwrap();

        record.board_width = 0;
        assert!(matches!(
            mgr.restore_game(record),
            Err(ManagerError::BadRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_sees_engine_events() {
        let mut mgr = manager();
        let id = mgr.create_game("g1".to_string(), specs(3)).unwrap();
        let rx = mgr.subscribe(id).await.unwrap();

        let game = mgr.get(id).unwrap();
        game.write().await.point_drop(123).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, crate::game::events::GameEvent::PointsGiven { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, crate::game::events::GameEvent::Save)));
    }

    #[tokio::test]
    async fn test_shutdown_all_stops_schedulers() {
        let mut mgr = manager();
        mgr.create_game("g1".to_string(), specs(2)).unwrap();
        mgr.create_game(
            "g2".to_string(),
            (0..2)
                .map(|i| PlayerSpec {
                    name: format!("Q{}", i),
                    icon: String::new(),
                    user_id: format!("other-{}", i),
                })
                .collect(),
        )
        .unwrap();

        mgr.shutdown_all();
        mgr.shutdown_all();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        for handle in mgr.games.values() {
            assert!(handle.scheduler.is_finished());
        }
    }
}
