//! Domain events: the append-only log entries and the subscriber fan-out.
//!
//! Every state change appends an event to the game's log and publishes the
//! same event to registered subscribers (persistence, renderer, notifier).
//! Publishing is fire-and-forget: a slow or dropped subscriber never blocks
//! the next action.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::player::PlayerId;
use crate::util::grid::{Coord, Direction};

/// A semantically meaningful action.
///
/// Externally tagged so the bincode codec in [`crate::game::persist`] can
/// round-trip the log (bincode cannot decode self-describing tag layouts);
/// the variant names still match the historical log format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    /// One accepted movement step
    Walk {
        player: PlayerId,
        dir: Direction,
        from: Coord,
        to: Coord,
    },
    /// A landed attack; `victim_lives` is the victim's new total
    Attack {
        attacker: PlayerId,
        victim: PlayerId,
        victim_lives: u32,
    },
    Gift {
        gifter: PlayerId,
        receiver: PlayerId,
        points: u32,
    },
    RangeIncrease {
        player: PlayerId,
        old_range: u32,
        new_range: u32,
    },
    /// Points leaving a player outside the gift flow (elimination plunder)
    PointTake { player: PlayerId, points: u32 },
    /// Points arriving at a player outside the gift flow
    PointGive { player: PlayerId, points: u32 },
    /// Batch periodic drop: one entry for the whole round, not one per player
    #[serde(rename = "points-given")]
    PointsGiven {
        at: u64,
        players: SmallVec<[PlayerId; 16]>,
    },
    /// Terminal transition; `winner` is the sole survivor, if any
    End { winner: Option<PlayerId> },
    /// "State changed, please persist" signal; notification only, never logged
    Save,
}

impl GameEvent {
    /// Whether this event belongs in the replay log.
    /// `Save` is a pure notification to the storage collaborator.
    pub fn is_loggable(&self) -> bool {
        !matches!(self, GameEvent::Save)
    }
}

/// Fan-out of engine events to external subscribers
///
/// Unbounded channels so the engine never blocks in its critical section;
/// consumers drain at their own pace and get at-least-once delivery per
/// mutation for as long as they hold the receiver.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<GameEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end
    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send to every live subscriber; disconnected ones are pruned
    pub fn publish(&mut self, event: &GameEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
