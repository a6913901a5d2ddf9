//! Tracks partial-destruction state per cell within one view (spec.md
//! §4.4). Deliberately ignorant of `BlockView`, the registry, and the
//! event bus — it only owns timing state and hands back outcomes for the
//! owning view to interpret, avoiding a reference cycle between view and
//! manager. Grounded on the teacher's `BreakingBlock` component plus its
//! `tick_block_breaking` sweep (`pickaxe-server::tick`), reshaped from a
//! per-entity ECS component into a per-position map since this engine has
//! no ECS world to attach components to.

use std::collections::HashMap;

use rand::Rng;
use viewforge_types::{BlockPosition, PlayerId};

use super::record::DigRecord;
use super::session::DigSession;

/// What happened to a record during a `tick`/`complete`/`cancel`/`destroy`
/// call, for the owning view to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DigOutcome {
    StageChanged { pos: BlockPosition, entity_id: i32, player: PlayerId, stage: i8 },
    Completed { pos: BlockPosition, player: PlayerId, total_ms: f64, last_stage: i8 },
    /// Session ended without breaking the block (cancel, quit, forced
    /// destroy); the view must clear the destroy overlay client-side.
    Cleared { pos: BlockPosition, entity_id: i32 },
}

#[derive(Debug, Default)]
pub struct DigManager {
    records: HashMap<BlockPosition, DigRecord>,
}

impl DigManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_entity_id(&self) -> i32 {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = -(rng.gen_range(1..=i32::MAX));
            if !self.records.values().any(|r| r.entity_id == candidate) {
                return candidate;
            }
        }
    }

    /// Starts a new session at `pos`, or resumes one from accumulated
    /// progress left by a prior cancel. Returns `false` if a session is
    /// already active there. The caller (the view) is responsible for
    /// verifying an override exists at `pos` before calling this.
    pub fn start(
        &mut self,
        player: PlayerId,
        pos: BlockPosition,
        full_break_ms: f64,
        speed_multiplier: f64,
        now_ms: u64,
    ) -> bool {
        if let Some(existing) = self.records.get(&pos) {
            if existing.session.is_some() {
                return false;
            }
        }
        let entity_id = self.fresh_entity_id();
        let record = self
            .records
            .entry(pos)
            .or_insert_with(|| DigRecord::new(entity_id, player));
        record.last_damager = player;
        let base = record.accumulated_ms;
        record.session = Some(DigSession::new(now_ms, base, full_break_ms, speed_multiplier));
        true
    }

    /// Advances every active session to `now_ms`. Returns one outcome per
    /// stage change or completion observed this call.
    pub fn tick(&mut self, now_ms: u64) -> Vec<DigOutcome> {
        let mut outcomes = Vec::new();
        let mut completed_positions = Vec::new();

        for (pos, record) in self.records.iter_mut() {
            let Some(session) = &mut record.session else { continue };
            if session.is_complete(now_ms) {
                let total_ms = session.total_ms(now_ms);
                let last_stage = session.last_stage;
                completed_positions.push(*pos);
                outcomes.push(DigOutcome::Completed {
                    pos: *pos,
                    player: record.last_damager,
                    total_ms,
                    last_stage,
                });
                continue;
            }
            let stage = session.current_stage(now_ms);
            if stage != session.last_stage {
                session.last_stage = stage;
                record.last_stage = stage;
                outcomes.push(DigOutcome::StageChanged {
                    pos: *pos,
                    entity_id: record.entity_id,
                    player: record.last_damager,
                    stage,
                });
            }
        }

        for pos in completed_positions {
            if let Some(record) = self.records.get_mut(&pos) {
                record.session = None;
                record.accumulated_ms = 0.0;
                record.last_stage = -1;
            }
            self.records.remove(&pos);
        }

        outcomes
    }

    /// Ends the active session at `pos` as a completion, provided it
    /// belongs to `player`. The caller performs the actual `break_block`;
    /// this only finalises timing state. Returns `None` if unauthorised or
    /// no active session exists.
    pub fn complete(&mut self, pos: BlockPosition, player: PlayerId, now_ms: u64) -> Option<DigOutcome> {
        let record = self.records.get(&pos)?;
        if record.last_damager != player {
            return None;
        }
        let session = record.session?;
        let total_ms = session.total_ms(now_ms);
        let last_stage = session.last_stage;
        self.records.remove(&pos);
        Some(DigOutcome::Completed { pos, player, total_ms, last_stage })
    }

    /// Cancels the active session at `pos`, provided it belongs to
    /// `player`. Progress is preserved on the record for a future
    /// `start()` to resume from (S4).
    pub fn cancel(&mut self, pos: BlockPosition, player: PlayerId, now_ms: u64) -> Option<DigOutcome> {
        let record = self.records.get_mut(&pos)?;
        if record.last_damager != player {
            return None;
        }
        let session = record.session.take()?;
        record.accumulated_ms = session.total_ms(now_ms);
        record.last_stage = session.last_stage;
        let entity_id = record.entity_id;
        if record.should_evict() {
            self.records.remove(&pos);
        }
        Some(DigOutcome::Cleared { pos, entity_id })
    }

    /// Forcibly ends every session last damaged by `player`, skipping the
    /// completion callback entirely — used on player quit.
    pub fn stop(&mut self, player: PlayerId) -> Vec<DigOutcome> {
        let positions: Vec<BlockPosition> = self
            .records
            .iter()
            .filter(|(_, r)| r.last_damager == player && r.session.is_some())
            .map(|(pos, _)| *pos)
            .collect();
        let mut outcomes = Vec::new();
        for pos in positions {
            if let Some(record) = self.records.get_mut(&pos) {
                record.session = None;
                record.accumulated_ms = 0.0;
                record.last_stage = -1;
                let entity_id = record.entity_id;
                outcomes.push(DigOutcome::Cleared { pos, entity_id });
            }
            self.records.remove(&pos);
        }
        outcomes
    }

    /// Forcibly ends the session at `pos`, if any, skipping the
    /// completion callback and evicting the record outright.
    pub fn destroy(&mut self, pos: BlockPosition) -> Option<DigOutcome> {
        let record = self.records.remove(&pos)?;
        Some(DigOutcome::Cleared { pos, entity_id: record.entity_id })
    }

    pub fn destroy_all(&mut self) -> Vec<DigOutcome> {
        self.records
            .drain()
            .map(|(pos, record)| DigOutcome::Cleared { pos, entity_id: record.entity_id })
            .collect()
    }

    /// Clears a record that has no active session, sending stage `-1`.
    /// No-op if a session is active.
    pub fn reset_block(&mut self, pos: BlockPosition) -> Option<DigOutcome> {
        let record = self.records.get(&pos)?;
        if record.session.is_some() {
            return None;
        }
        let entity_id = record.entity_id;
        self.records.remove(&pos);
        Some(DigOutcome::Cleared { pos, entity_id })
    }

    /// Displays paused progress without starting a timer: used to restore
    /// a visual stage (e.g. after a server restart) independent of any
    /// live session.
    pub fn simulate_partial_break(&mut self, player: PlayerId, pos: BlockPosition, fraction: f64, full_break_ms: f64) -> DigOutcome {
        let fraction = fraction.clamp(0.0, 1.0);
        let entity_id = self.fresh_entity_id();
        let record = self
            .records
            .entry(pos)
            .or_insert_with(|| DigRecord::new(entity_id, player));
        record.last_damager = player;
        record.accumulated_ms = fraction * full_break_ms;
        record.last_stage = (fraction * 9.0).ceil() as i8;
        DigOutcome::StageChanged { pos, entity_id: record.entity_id, player, stage: record.last_stage }
    }

    /// Re-emits `last_stage` for every paused (sessionless) record, and
    /// evicts any record left with no progress at all. Invoked
    /// periodically by a background synchroniser, not per tick.
    pub fn sync(&mut self) -> Vec<DigOutcome> {
        let mut outcomes = Vec::new();
        let mut to_evict = Vec::new();
        for (pos, record) in self.records.iter() {
            if record.session.is_some() {
                continue;
            }
            if record.accumulated_ms <= 0.0 && record.last_stage < 0 {
                to_evict.push(*pos);
                continue;
            }
            outcomes.push(DigOutcome::StageChanged {
                pos: *pos,
                entity_id: record.entity_id,
                player: record.last_damager,
                stage: record.last_stage,
            });
        }
        for pos in to_evict {
            self.records.remove(&pos);
        }
        outcomes
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_active_session(&self, pos: &BlockPosition) -> bool {
        self.records.get(pos).map(|r| r.session.is_some()).unwrap_or(false)
    }

    /// Progress persisted at `pos` outside of any active session (what a
    /// future `start()` would resume from). `0.0` if there is no record.
    pub fn accumulated_ms(&self, pos: &BlockPosition) -> f64 {
        self.records.get(pos).map(|r| r.accumulated_ms).unwrap_or(0.0)
    }
}
