//! Tank Tactics Game Engine
//!
//! The rules evaluator for a multiplayer grid-based strategy game: players
//! spend action points to move, attack, gift and extend their range on a 2D
//! board, a periodic drop replenishes points, and every state change is
//! appended to an ordered event log consumed by external persistence and
//! rendering collaborators.
//!
//! The surrounding glue (chat command parsing, database writes, board
//! rendering, transport) lives outside this crate; callers invoke the
//! operations on [`game::state::Game`] and observe the event stream.

pub mod config;
pub mod util;
pub mod game;
