//! Persistence records and the byte codec used by the external storage
//! collaborator.
//!
//! [`GameRecord`] is the serialize/deserialize contract: a plain struct
//! carrying every persisted field, including the full event log, so that
//! [`crate::game::state::Game::snapshot`] and `Game::restore` are lossless
//! inverses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::events::GameEvent;
use crate::game::player::Player;
use crate::game::state::GamePhase;

/// Plain, lossless snapshot of one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: Uuid,
    pub name: String,
    pub board_width: u32,
    pub board_height: u32,
    pub last_gift_round: u64,
    pub gift_round_interval: u64,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub log: Vec<GameEvent>,
}

/// Encode a record to bytes using bincode
pub fn encode(record: &GameRecord) -> Result<Vec<u8>, PersistError> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .map_err(|e| PersistError::Encode(e.to_string()))
}

/// Decode a record from bytes using bincode
pub fn decode(data: &[u8]) -> Result<GameRecord, PersistError> {
    bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map(|(record, _)| record)
        .map_err(|e| PersistError::Decode(e.to_string()))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
