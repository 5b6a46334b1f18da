//! Collects sessions from every device into the final, time-sorted table.

use session_core::models::{NoResultReason, Session, SessionTable};
use tracing::{info, warn};

/// Accumulates sessions across device groups.
#[derive(Debug, Default)]
pub struct ResultAssembler {
    sessions: Vec<Session>,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Sort every collected session by start time, across devices.
    ///
    /// The sort is stable: sessions starting at the same instant stay in the
    /// order they were pushed (device order).
    pub fn finish(mut self) -> Result<SessionTable, NoResultReason> {
        if self.sessions.is_empty() {
            warn!("No sessions produced");
            return Err(NoResultReason::NoSessionsProduced);
        }

        self.sessions.sort_by_key(|s| s.start_time);
        info!("Sessions produced: {}", self.sessions.len());
        Ok(SessionTable {
            sessions: self.sessions,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
