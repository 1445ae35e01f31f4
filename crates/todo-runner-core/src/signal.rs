//! One-shot celebration signal raised when a task gets completed.
//!
//! The reset is a cancellable deadline evaluated against whatever clock
//! the owner passes in, so nothing here sleeps or spawns.

use tracing::debug;

/// How long the signal stays visible after being raised.
pub const CELEBRATION_MS: i64 = 3_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Celebration {
    clears_at: Option<i64>,
}

impl Celebration {
    /// Raises the signal, restarting the window if it is already up.
    pub fn raise(&mut self, now_ms: i64) {
        let clears_at = now_ms.saturating_add(CELEBRATION_MS);
        debug!(now_ms, clears_at, restarted = self.clears_at.is_some(), "celebration raised");
        self.clears_at = Some(clears_at);
    }

    /// Drops a pending reset and hides the signal immediately.
    pub fn cancel(&mut self) {
        if self.clears_at.take().is_some() {
            debug!("celebration cancelled");
        }
    }

    /// Runs the scheduled reset if its deadline has passed. Returns true
    /// when this call cleared the signal.
    pub fn poll(&mut self, now_ms: i64) -> bool {
        match self.clears_at {
            Some(deadline) if now_ms >= deadline => {
                self.clears_at = None;
                debug!(now_ms, deadline, "celebration cleared");
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, now_ms: i64) -> bool {
        self.clears_at.map(|deadline| now_ms < deadline).unwrap_or(false)
    }

    pub fn clears_at(&self) -> Option<i64> {
        self.clears_at
    }
}
