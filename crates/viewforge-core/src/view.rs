//! The per-view override store and its public contract (spec.md §4.2).
//! Grounded on `pickaxe-server::bridge::BlockOverrides` for the
//! override-storage shape and on `pickaxe-server::tick::complete_block_break`
//! for the break-event-then-commit sequencing, generalised from "one
//! override table for the whole server" to "one bounded, audience-scoped
//! table per view".

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tracing::warn;
use viewforge_registry::{BlockDataRegistry, ViewBlockData};
use viewforge_types::{BlockPosition, BoundingBox, ChunkKey, PlayerId, RelativePos, ViewId};

use crate::audience::Audience;
use crate::break_time::BreakTimeCalculator;
use crate::dig::{DigManager, DigOutcome};
use crate::dispatcher::PacketDispatcher;
use crate::error::{ViewError, ViewResult};
use viewforge_events::{EventBus, EventKind, TriggerSource, ViewBlockBreak, ViewBlockDig, ViewBlockPlace, ViewBlockSet, ViewEvent};
use crate::host::{BreakContext, PlayerHost, WorldHost};
use crate::options::{BreakMode, UnmanagedBlockBehavior, ViewOptions, ViewType};
use crate::packet::ViewforgePacket;

pub struct BlockView {
    pub id: ViewId,
    pub bbox: BoundingBox,
    pub view_type: ViewType,
    pub options: ViewOptions,
    pub owner_id: Option<PlayerId>,
    overrides: HashMap<RelativePos, i16>,
    audiences: Vec<Audience>,
    dig_manager: DigManager,
    registry: Arc<BlockDataRegistry>,
    events: Arc<EventBus>,
    break_calc: Arc<BreakTimeCalculator>,
}

impl BlockView {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ViewId,
        bbox: BoundingBox,
        view_type: ViewType,
        options: ViewOptions,
        owner_id: Option<PlayerId>,
        registry: Arc<BlockDataRegistry>,
        events: Arc<EventBus>,
        break_calc: Arc<BreakTimeCalculator>,
    ) -> Self {
        Self {
            id,
            bbox,
            view_type,
            options,
            owner_id,
            overrides: HashMap::new(),
            audiences: Vec::new(),
            dig_manager: DigManager::new(),
            registry,
            events,
            break_calc,
        }
    }

    fn relative_of(&self, pos: &BlockPosition) -> ViewResult<RelativePos> {
        self.bbox.relative_of(pos).ok_or(ViewError::OutOfBounds)
    }

    fn resolve_viewers(&self, players: &dyn PlayerHost, chunk: ChunkKey) -> Vec<PlayerId> {
        let mut seen = Vec::new();
        for audience in &self.audiences {
            for player in audience.resolve(players) {
                if players.has_chunk_loaded(player, chunk) && !seen.contains(&player) {
                    seen.push(player);
                }
            }
        }
        seen
    }

    pub fn get(&self, pos: &BlockPosition) -> ViewResult<Option<ViewBlockData>> {
        let rel = self.relative_of(pos)?;
        Ok(match self.overrides.get(&rel) {
            Some(&id) => self.registry.lookup(id),
            None => None,
        })
    }

    pub fn is_managed(&self, pos: &BlockPosition) -> bool {
        self.relative_of(pos).ok().map(|rel| self.overrides.contains_key(&rel)).unwrap_or(false)
    }

    pub fn is_original_content(&self, pos: &BlockPosition) -> bool {
        self.bbox.is_inside(pos) && !self.is_managed(pos)
    }

    /// Writes a single override, notifying `emit_event`'s subscribers and
    /// sending the new block to every viewer of the containing chunk.
    pub fn set(
        &mut self,
        pos: BlockPosition,
        data: ViewBlockData,
        emit_event: bool,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<()> {
        let rel = self.relative_of(&pos)?;
        let id = self.registry.intern(data.clone())?;
        self.overrides.insert(rel, id);

        if emit_event {
            let mut event = ViewEvent::Set(ViewBlockSet { view: self.id, pos, data: data.clone() });
            self.events.dispatch(&mut event);
        }

        let wire_state = data.to_wire_state();
        for viewer in self.resolve_viewers(players, pos.chunk_key()) {
            dispatcher.enqueue(viewer, ViewforgePacket::BlockUpdate { pos, wire_state });
        }
        Ok(())
    }

    /// Batched `set`: every write is committed before any packet is sent,
    /// coalesced into one `MultiBlockChange` per affected chunk per viewer.
    pub fn set_many(
        &mut self,
        writes: HashMap<BlockPosition, ViewBlockData>,
        emit_events: bool,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<()> {
        let mut by_chunk: HashMap<ChunkKey, Vec<(BlockPosition, i32)>> = HashMap::new();

        for (pos, data) in writes {
            let rel = self.relative_of(&pos)?;
            let id = self.registry.intern(data.clone())?;
            self.overrides.insert(rel, id);

            if emit_events {
                let mut event = ViewEvent::Set(ViewBlockSet { view: self.id, pos, data: data.clone() });
                self.events.dispatch(&mut event);
            }

            by_chunk.entry(pos.chunk_key()).or_default().push((pos, data.to_wire_state()));
        }

        for (chunk, changes) in by_chunk {
            for viewer in self.resolve_viewers(players, chunk) {
                dispatcher.enqueue(viewer, ViewforgePacket::MultiBlockChange { changes: changes.clone() });
            }
        }
        Ok(())
    }

    /// Emits a cancellable `ViewBlockBreak`, then, unless cancelled, commits
    /// the proposed output, clears any dig record, and optionally plays the
    /// break animation.
    pub fn break_block(
        &mut self,
        player: Option<PlayerId>,
        pos: BlockPosition,
        play_animation: bool,
        emit_event: bool,
        trigger_source: TriggerSource,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<ViewBlockData> {
        let rel = self.relative_of(&pos)?;
        if matches!(self.options.break_mode, BreakMode::Disabled) {
            return Err(ViewError::Cancelled);
        }
        let original = self.get(&pos)?.ok_or(ViewError::NoSuchBlock)?;
        let output_default = ViewBlockData::air();

        let mut event = ViewEvent::Break(ViewBlockBreak {
            view: self.id,
            player,
            pos,
            original: original.clone(),
            output: output_default,
            trigger_source,
            cancelled: false,
        });
        if emit_event {
            self.events.dispatch(&mut event);
        }
        if event.is_cancelled() {
            return Err(ViewError::Cancelled);
        }
        let output = match event {
            ViewEvent::Break(e) => e.output,
            _ => unreachable!(),
        };

        let id = self.registry.intern(output.clone())?;
        self.overrides.insert(rel, id);
        if let Some(DigOutcome::Cleared { entity_id, .. }) = self.dig_manager.destroy(pos) {
            self.set_block_progress(entity_id, pos, -1, players, dispatcher);
        }

        if play_animation {
            let wire_state = output.to_wire_state();
            for viewer in self.resolve_viewers(players, pos.chunk_key()) {
                dispatcher.enqueue(viewer, ViewforgePacket::BlockUpdate { pos, wire_state });
            }
        }
        Ok(output)
    }

    /// Re-sends the current override at `pos` (or the authoritative world
    /// state if unmanaged) to `audience` only.
    pub fn refresh_block(
        &self,
        audience: &Audience,
        pos: BlockPosition,
        world: &dyn WorldHost,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<()> {
        self.relative_of(&pos)?;
        let wire_state = match self.get(&pos)? {
            Some(data) => data.to_wire_state(),
            None => world.world_block_state(&pos),
        };
        for viewer in audience.resolve(players) {
            if players.has_chunk_loaded(viewer, pos.chunk_key()) {
                dispatcher.enqueue(viewer, ViewforgePacket::BlockUpdate { pos, wire_state });
            }
        }
        Ok(())
    }

    fn chunk_overrides(&self, chunk: ChunkKey) -> Vec<(BlockPosition, i32)> {
        self.overrides
            .iter()
            .filter_map(|(&rel, &id)| {
                let pos = self.bbox.block_at(rel);
                if pos.chunk_key() != chunk {
                    return None;
                }
                self.registry.lookup(id).map(|data| (pos, data.to_wire_state()))
            })
            .collect()
    }

    /// Bulk-sends every override to `audience`, one section packet per
    /// occupied chunk in the view's bounding box.
    pub fn apply(&self, audience: &Audience, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        for chunk in self.bbox.overlapping_chunks() {
            self.apply_chunk_for(audience, chunk, players, dispatcher);
        }
    }

    pub fn apply_chunk(&self, audience: &Audience, cx: i32, cz: i32, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        self.apply_chunk_for(audience, ChunkKey::new(self.bbox.world, cx, cz), players, dispatcher);
    }

    fn apply_chunk_for(&self, audience: &Audience, chunk: ChunkKey, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        let changes = self.chunk_overrides(chunk);
        if changes.is_empty() {
            return;
        }
        for viewer in audience.resolve(players) {
            if players.has_chunk_loaded(viewer, chunk) {
                dispatcher.enqueue(viewer, ViewforgePacket::MultiBlockChange { changes: changes.clone() });
            }
        }
    }

    /// Sends the authoritative world state for every cell in the view,
    /// removing the overlay client-side.
    pub fn reset(&self, audience: &Audience, world: &dyn WorldHost, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        for chunk in self.bbox.overlapping_chunks() {
            self.reset_chunk_for(audience, chunk, world, players, dispatcher);
        }
    }

    pub fn reset_chunk(&self, audience: &Audience, cx: i32, cz: i32, world: &dyn WorldHost, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        self.reset_chunk_for(audience, ChunkKey::new(self.bbox.world, cx, cz), world, players, dispatcher);
    }

    fn reset_chunk_for(&self, audience: &Audience, chunk: ChunkKey, world: &dyn WorldHost, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        let changes: Vec<(BlockPosition, i32)> = self
            .overrides
            .keys()
            .map(|&rel| self.bbox.block_at(rel))
            .filter(|pos| pos.chunk_key() == chunk)
            .map(|pos| (pos, world.world_block_state(&pos)))
            .collect();
        if changes.is_empty() {
            return;
        }
        for viewer in audience.resolve(players) {
            if players.has_chunk_loaded(viewer, chunk) {
                dispatcher.enqueue(viewer, ViewforgePacket::MultiBlockChange { changes: changes.clone() });
            }
        }
    }

    /// Adds `audience` to the view's membership. If `apply`, immediately
    /// syncs every override to it.
    pub fn add_audience(&mut self, audience: Audience, apply: bool, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) -> ViewResult<()> {
        if self.view_type.is_placeholder() {
            return Err(ViewError::IsPlaceholder);
        }
        if apply {
            self.apply(&audience, players, dispatcher);
        }
        self.audiences.push(audience);
        Ok(())
    }

    /// Removes `audience`. If `reset`, clears its client-side overlays
    /// before the audience stops receiving updates.
    pub fn remove_audience(&mut self, audience: &Audience, reset: bool, world: &dyn WorldHost, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) -> ViewResult<()> {
        if self.view_type.is_placeholder() {
            return Err(ViewError::IsPlaceholder);
        }
        if reset {
            self.reset(audience, world, players, dispatcher);
        }
        self.audiences.retain(|a| a != audience);
        Ok(())
    }

    pub fn audiences(&self) -> &[Audience] {
        &self.audiences
    }

    /// Emits a destruction-stage packet; `-1` clears the overlay. Sent to
    /// every viewer of the containing chunk.
    pub fn set_block_progress(&self, entity_id: i32, pos: BlockPosition, stage: i8, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        let stage = stage.clamp(-1, 9);
        for viewer in self.resolve_viewers(players, pos.chunk_key()) {
            dispatcher.enqueue(viewer, ViewforgePacket::SetBlockDestroyStage { entity_id, pos, stage });
        }
    }

    /// Produces a new view with the same override contents but a fresh,
    /// randomly-allocated id, no audiences, and `new_type` in place of this
    /// view's type (so e.g. a `Persistent` view can be copied into a
    /// throwaway `Transient` one, or vice versa).
    pub fn copy(&self, new_origin: (i32, i32, i32), new_type: ViewType) -> BlockView {
        let bbox = BoundingBox::new(self.bbox.world, new_origin, (self.bbox.width, self.bbox.height, self.bbox.depth));
        BlockView {
            id: ViewId(rand::thread_rng().gen()),
            bbox,
            view_type: new_type,
            options: self.options,
            owner_id: self.owner_id,
            overrides: self.overrides.clone(),
            audiences: Vec::new(),
            dig_manager: DigManager::new(),
            registry: self.registry.clone(),
            events: self.events.clone(),
            break_calc: self.break_calc.clone(),
        }
    }

    fn break_context_for(&self, data: &ViewBlockData, ctx: &BreakContext) -> Option<f64> {
        let harvest_tools: Vec<String> = {
            // `preferred_tool`/`harvestable_by` only answer membership; the
            // break-time calculator wants the whole list, so rebuild it for
            // custom blocks and fall back to an empty list for vanilla ones
            // (their tool table isn't exposed beyond membership checks).
            match data {
                ViewBlockData::Custom(custom) => custom.harvest_tools.clone(),
                ViewBlockData::Vanilla(_) => Vec::new(),
            }
        };
        let material = match data {
            ViewBlockData::Custom(custom) => custom.material.clone(),
            ViewBlockData::Vanilla(state) => state.name.clone(),
        };
        self.break_calc.full_break_ms(data.hardness(), &material, &harvest_tools, ctx)
    }

    /// Starts a dig session at `pos`. Fails `NoSuchBlock` if no override is
    /// present, and is a no-op returning `false` if a session is already
    /// active there. Unbreakable blocks (`hardness < 0`) never complete.
    /// `speed_multiplier` scales elapsed real time independent of
    /// `break_ctx` (spec.md §4.4's caller-supplied knob); pass `1.0` for
    /// ordinary play.
    pub fn start_dig(&mut self, player: PlayerId, pos: BlockPosition, break_ctx: &BreakContext, speed_multiplier: f64, now_ms: u64) -> ViewResult<bool> {
        let data = self.get(&pos)?.ok_or(ViewError::NoSuchBlock)?;
        let full_break_ms = self.break_context_for(&data, break_ctx).unwrap_or(f64::INFINITY);
        Ok(self.dig_manager.start(player, pos, full_break_ms, speed_multiplier, now_ms))
    }

    /// Cancels the session at `pos` on `player`'s behalf. Non-resumable
    /// blocks discard accumulated progress outright (`accumulated_ms`
    /// resets to `0`, the paused stage to `-1`); resumable blocks keep it
    /// for a future `start_dig` to pick back up.
    pub fn cancel_dig(&mut self, pos: BlockPosition, player: PlayerId, now_ms: u64, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) -> bool {
        let resumable = self.get(&pos).ok().flatten().map(|d| d.resumable()).unwrap_or(false);
        match self.dig_manager.cancel(pos, player, now_ms) {
            Some(DigOutcome::Cleared { pos, entity_id }) => {
                if !resumable {
                    self.dig_manager.destroy(pos);
                }
                self.set_block_progress(entity_id, pos, -1, players, dispatcher);
                true
            }
            _ => false,
        }
    }

    /// Progress persisted at `pos` outside of any active session, for
    /// observing the post-cancel resumability outcome.
    pub fn dig_progress_ms(&self, pos: &BlockPosition) -> f64 {
        self.dig_manager.accumulated_ms(pos)
    }

    /// Forcibly completes (authorised) or fails (unauthorised) an active
    /// dig; on success drives `break_block` with `Player` as the trigger.
    pub fn complete_dig(
        &mut self,
        pos: BlockPosition,
        player: PlayerId,
        now_ms: u64,
        play_animation: bool,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<ViewBlockData> {
        match self.dig_manager.complete(pos, player, now_ms) {
            Some(DigOutcome::Completed { .. }) => {
                self.break_block(Some(player), pos, play_animation, true, TriggerSource::Player, players, dispatcher)
            }
            _ => Err(ViewError::Unauthorized),
        }
    }

    /// Ends every session owned by `player` without completing them
    /// (used on disconnect).
    pub fn stop_player_digs(&mut self, player: PlayerId, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        for outcome in self.dig_manager.stop(player) {
            if let DigOutcome::Cleared { pos, entity_id } = outcome {
                self.set_block_progress(entity_id, pos, -1, players, dispatcher);
            }
        }
    }

    /// Forcibly ends every active or paused dig session in this view,
    /// clearing each destroy-stage overlay client-side. Used when the
    /// view itself is closing.
    pub fn destroy_all_dig_sessions(&mut self, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        for outcome in self.dig_manager.destroy_all() {
            if let DigOutcome::Cleared { pos, entity_id } = outcome {
                self.set_block_progress(entity_id, pos, -1, players, dispatcher);
            }
        }
    }

    /// Advances every active dig session by one tick, turning
    /// `DigManager` outcomes into `ViewBlockDig` events, progress packets,
    /// and (on completion) a `break_block` call.
    pub fn dig_tick(&mut self, now_ms: u64, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) {
        let outcomes = self.dig_manager.tick(now_ms);
        for outcome in outcomes {
            match outcome {
                DigOutcome::StageChanged { pos, entity_id, player, stage } => {
                    let stage = self.emit_dig_event(pos, player, stage);
                    self.set_block_progress(entity_id, pos, stage, players, dispatcher);
                }
                DigOutcome::Completed { pos, player, .. } => {
                    if let Err(err) = self.break_block(Some(player), pos, true, true, TriggerSource::Player, players, dispatcher) {
                        warn!(view = ?self.id, ?pos, ?err, "dig completion break_block failed");
                    }
                }
                DigOutcome::Cleared { pos, entity_id } => {
                    self.set_block_progress(entity_id, pos, -1, players, dispatcher);
                }
            }
        }
    }

    /// Dispatches a `ViewBlockDig` for a stage transition and returns the
    /// (possibly subscriber-mutated) stage to actually emit.
    fn emit_dig_event(&self, pos: BlockPosition, player: PlayerId, stage: i8) -> i8 {
        let data = self.get(&pos).ok().flatten().unwrap_or_else(ViewBlockData::air);
        let mut event = ViewEvent::Dig(ViewBlockDig { view: self.id, player, pos, data, stage });
        self.events.dispatch(&mut event);
        match event {
            ViewEvent::Dig(e) => e.stage,
            _ => stage,
        }
    }

    /// Displays an unmanaged cell's place-event hook: fires a cancellable
    /// `ViewBlockPlace`, and on success stores `data` exactly like `set`.
    pub fn place_block(
        &mut self,
        player: Option<PlayerId>,
        pos: BlockPosition,
        data: ViewBlockData,
        placed_against: Option<BlockPosition>,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<()> {
        if matches!(self.options.place_mode, crate::options::PlaceMode::Disabled) {
            return Err(ViewError::Cancelled);
        }
        let mut event = ViewEvent::Place(ViewBlockPlace {
            view: self.id,
            player,
            pos,
            data: data.clone(),
            placed_against,
            cancelled: false,
        });
        self.events.dispatch(&mut event);
        if event.is_cancelled() {
            return Err(ViewError::Cancelled);
        }
        self.set(pos, data, false, players, dispatcher)
    }

    /// Whether interacting with `pos` is permitted given
    /// `unmanaged_block_behavior` when the cell holds no override.
    pub fn permits_unmanaged_interaction(&self, pos: &BlockPosition) -> bool {
        if self.is_managed(pos) {
            return true;
        }
        matches!(self.options.unmanaged_block_behavior, UnmanagedBlockBehavior::Allow)
    }

    pub fn event_kind_registered(&self, kind: EventKind) -> bool {
        self.events.listener_count(kind) > 0
    }
}
