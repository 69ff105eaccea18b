//! Periodic action-point drop task.
//!
//! One task per game. It takes the same write lock every user action takes,
//! so a drop never interleaves with a concurrent move or attack, and the
//! critical section holds only the in-memory mutation; subscribers do any
//! I/O on their side of the channel. The sleeps run on tokio's clock, so the
//! paused-time tests below drive the loop deterministically.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::game::engine::GameError;
use crate::game::state::{unix_ms, Game};

/// Owns the drop timer for one game
pub struct DropScheduler {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl DropScheduler {
    /// Spawn the drop loop. It re-arms itself after every drop and exits on
    /// its own once the game ends.
    pub fn spawn(game: Arc<RwLock<Game>>) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let handle = tokio::spawn(async move {
            loop {
                let wait_ms = {
                    let g = game.read().await;
                    if g.is_ended() {
                        break;
                    }
                    g.next_drop_at().saturating_sub(unix_ms())
                };

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {}
                    _ = stop.changed() => break,
                }

                let mut g = game.write().await;
                match g.point_drop(unix_ms()) {
                    Ok(count) => debug!(game = %g.id, count, "scheduled action point drop"),
                    Err(GameError::GameOver) => break,
                    Err(e) => {
                        warn!(game = %g.id, error = %e, "action point drop failed");
                        break;
                    }
                }
                if g.is_ended() {
                    break;
                }
            }
        });
        Self { handle, shutdown }
    }

    /// Request shutdown. Idempotent; safe to call after the task already
    /// exited on its own.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DropScheduler {
    fn drop(&mut self) {
        self.stop();
        self.handle.abort();
    }
}
