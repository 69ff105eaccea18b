//! Rule-enforcing operations: move, attack, gift, range growth, the periodic
//! point drop and the win-condition state machine.
//!
//! Every operation validates fully before committing (multi-step movement is
//! the one intentional exception: it applies as many whole steps as remain
//! valid and reports the count). Each successful mutation appends log
//! entries, publishes events and finishes with a `Save` signal for the
//! storage collaborator.

use smallvec::SmallVec;
use tracing::{debug, info};

use crate::game::events::GameEvent;
use crate::game::player::PlayerId;
use crate::game::state::{Game, GamePhase};
use crate::util::grid::Direction;

/// Cost of one extra unit of range
pub const RANGE_UPGRADE_COST: u32 = 2;

/// Recoverable operation outcomes; the command layer turns these into
/// user-facing text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("No such player")]
    NotFound,
    #[error("The game is already over")]
    GameOver,
    #[error("Not enough action points")]
    InsufficientPoints,
    #[error("Target is out of range")]
    OutOfRange,
    #[error("Blocked or out of bounds")]
    BlockedOrOutOfBounds,
    #[error("The board cannot fit every player")]
    BoardTooSmall,
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("That player is dead")]
    AlreadyDead,
}

impl Game {
    fn ensure_ongoing(&self) -> Result<(), GameError> {
        if self.is_ended() {
            Err(GameError::GameOver)
        } else {
            Ok(())
        }
    }

    /// Walk up to `steps` unit steps in `dir`, each costing one point.
    ///
    /// The step sequence halts (without failing) at the board edge, at a cell
    /// occupied by a living player, or when points run out; the return value
    /// is the number of steps actually taken. A call that cannot take a
    /// single step reports why: `InsufficientPoints` when the player has no
    /// points at all, `BlockedOrOutOfBounds` when the first candidate cell is
    /// unreachable.
    pub fn move_player(
        &mut self,
        id: PlayerId,
        dir: Direction,
        steps: u32,
    ) -> Result<u32, GameError> {
        self.ensure_ongoing()?;
        let player = self.get_player(id).ok_or(GameError::NotFound)?;
        if !player.is_alive() {
            return Err(GameError::AlreadyDead);
        }
        if player.points == 0 {
            return Err(GameError::InsufficientPoints);
        }
        if steps == 0 {
            return Ok(0);
        }

        let mut taken = 0u32;
        while taken < steps {
            let (from, points) = match self.get_player(id) {
                Some(p) => (p.coords, p.points),
                None => break,
            };
            if points == 0 {
                break;
            }
            let to = from.step(dir);
            if !self.in_bounds(to) || self.is_occupied(to) {
                break;
            }
            if let Some(p) = self.player_mut(id) {
                p.coords = to;
                p.remove_points(1);
            }
            self.record(GameEvent::Walk {
                player: id,
                dir,
                from,
                to,
            });
            taken += 1;
        }

        if taken == 0 {
            return Err(GameError::BlockedOrOutOfBounds);
        }
        debug!(game = %self.id, player = %id, ?dir, taken, "walk");
        self.record(GameEvent::Save);
        Ok(taken)
    }

    /// Attack costs one point and removes one life from a victim within the
    /// attacker's Chebyshev range (inclusive).
    ///
    /// Eliminating the victim increments the attacker's kill count and
    /// plunders half the victim's remaining points (floor division), then
    /// runs the win check. Rejecting self-attack is the caller's job; the
    /// engine applies the same distance math to every pair.
    pub fn attack(&mut self, attacker: PlayerId, victim: PlayerId) -> Result<(), GameError> {
        self.ensure_ongoing()?;
        let (a_coords, a_range, a_points, a_alive) = {
            let a = self.get_player(attacker).ok_or(GameError::NotFound)?;
            (a.coords, a.range, a.points, a.is_alive())
        };
        let (v_coords, v_alive) = {
            let v = self.get_player(victim).ok_or(GameError::NotFound)?;
            (v.coords, v.is_alive())
        };
        if !a_alive || !v_alive {
            return Err(GameError::AlreadyDead);
        }
        if a_points < 1 {
            return Err(GameError::InsufficientPoints);
        }
        if a_coords.chebyshev(v_coords) > a_range {
            return Err(GameError::OutOfRange);
        }

        let victim_lives = match self.player_mut(victim) {
            Some(v) => v.lose_life(),
            None => return Err(GameError::NotFound),
        };
        if let Some(a) = self.player_mut(attacker) {
            a.remove_points(1);
        }
        self.record(GameEvent::Attack {
            attacker,
            victim,
            victim_lives,
        });

        if victim_lives == 0 {
            let plunder = self.get_player(victim).map(|v| v.points / 2).unwrap_or(0);
            if let Some(v) = self.player_mut(victim) {
                v.remove_points(plunder);
            }
            if let Some(a) = self.player_mut(attacker) {
                a.add_kill();
                a.add_points(plunder);
            }
            self.record(GameEvent::PointTake {
                player: victim,
                points: plunder,
            });
            self.record(GameEvent::PointGive {
                player: attacker,
                points: plunder,
            });
            info!(game = %self.id, %attacker, %victim, plunder, "player eliminated");
            self.check_win();
        }

        self.record(GameEvent::Save);
        Ok(())
    }

    /// Transfer `amount` points to a living receiver within the gifter's
    /// Chebyshev range.
    ///
    /// The distance check is unconditional. The gifter does not need to be
    /// alive: eliminated players may still hand off leftover points to
    /// someone in range.
    pub fn gift(
        &mut self,
        gifter: PlayerId,
        receiver: PlayerId,
        amount: u32,
    ) -> Result<(), GameError> {
        self.ensure_ongoing()?;
        let (g_coords, g_range, g_points) = {
            let g = self.get_player(gifter).ok_or(GameError::NotFound)?;
            (g.coords, g.range, g.points)
        };
        let (r_coords, r_alive) = {
            let r = self.get_player(receiver).ok_or(GameError::NotFound)?;
            (r.coords, r.is_alive())
        };
        if amount == 0 {
            return Err(GameError::InvalidAmount);
        }
        if !r_alive {
            return Err(GameError::AlreadyDead);
        }
        if g_points < amount {
            return Err(GameError::InsufficientPoints);
        }
        if g_coords.chebyshev(r_coords) > g_range {
            return Err(GameError::OutOfRange);
        }

        if let Some(g) = self.player_mut(gifter) {
            g.remove_points(amount);
        }
        if let Some(r) = self.player_mut(receiver) {
            r.add_points(amount);
        }
        self.record(GameEvent::Gift {
            gifter,
            receiver,
            points: amount,
        });
        debug!(game = %self.id, %gifter, %receiver, amount, "gift");
        self.record(GameEvent::Save);
        Ok(())
    }

    /// Spend two points for one extra unit of range. The debit and the
    /// increment are two effects of one operation, never applied separately.
    pub fn increase_range(&mut self, id: PlayerId) -> Result<(), GameError> {
        self.ensure_ongoing()?;
        let player = self.get_player(id).ok_or(GameError::NotFound)?;
        if !player.is_alive() {
            return Err(GameError::AlreadyDead);
        }
        if player.points < RANGE_UPGRADE_COST {
            return Err(GameError::InsufficientPoints);
        }

        let old_range = player.range;
        if let Some(p) = self.player_mut(id) {
            p.remove_points(RANGE_UPGRADE_COST);
            p.increase_range();
        }
        self.record(GameEvent::RangeIncrease {
            player: id,
            old_range,
            new_range: old_range + 1,
        });
        debug!(game = %self.id, player = %id, new_range = old_range + 1, "range increase");
        self.record(GameEvent::Save);
        Ok(())
    }

    /// Periodic replenishment: +1 point to every living player.
    ///
    /// Logged as one batch entry carrying the recipient ids, so a replay
    /// consumer sees the aggregate without O(players) log spam. Returns the
    /// recipient count and advances `last_gift_round` to `now_ms`.
    pub fn point_drop(&mut self, now_ms: u64) -> Result<u32, GameError> {
        self.ensure_ongoing()?;
        let recipients: SmallVec<[PlayerId; 16]> =
            self.alive_players().map(|p| p.id).collect();
        for id in &recipients {
            if let Some(p) = self.player_mut(*id) {
                p.add_points(1);
            }
        }
        self.last_gift_round = now_ms;
        let count = recipients.len() as u32;
        self.record(GameEvent::PointsGiven {
            at: now_ms,
            players: recipients,
        });
        debug!(game = %self.id, count, "action point drop");
        self.record(GameEvent::Save);
        Ok(count)
    }

    /// Ongoing -> Ended once the living count drops to one or zero.
    /// Fires at most once; after it, every mutating call fails with
    /// `GameOver`.
    pub(crate) fn check_win(&mut self) {
        if self.phase == GamePhase::Ended {
            return;
        }
        if self.alive_count() <= 1 {
            self.phase = GamePhase::Ended;
            let winner = self.alive_players().next().map(|p| p.id);
            info!(game = %self.id, ?winner, "game over");
            self.record(GameEvent::End { winner });
        }
    }
}
