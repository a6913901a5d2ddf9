//! Per-cell digging bookkeeping (spec.md §3 `DigRecord`). A record outlives
//! any single session so cancel-and-resume (S4) can carry accumulated
//! progress forward, and so `sync` can re-emit a paused stage after a
//! dropped packet.

use viewforge_types::PlayerId;

use super::session::DigSession;

#[derive(Debug, Clone)]
pub struct DigRecord {
    pub entity_id: i32,
    pub last_damager: PlayerId,
    pub session: Option<DigSession>,
    pub accumulated_ms: f64,
    pub last_stage: i8,
}

impl DigRecord {
    pub fn new(entity_id: i32, last_damager: PlayerId) -> Self {
        Self {
            entity_id,
            last_damager,
            session: None,
            accumulated_ms: 0.0,
            last_stage: -1,
        }
    }

    /// A record is kept only while it is still meaningful: an active
    /// session, or a paused stage still drawn on clients.
    pub fn should_evict(&self) -> bool {
        self.session.is_none() && self.last_stage < 0
    }
}
