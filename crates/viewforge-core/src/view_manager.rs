//! Chunk-indexed registry of every registered view, plus a per-player
//! visibility index (spec.md §4.3). Grounded on
//! `pickaxe-server::state::ServerState`'s chunk-keyed maps for the index
//! shape, generalised from "one world's loaded chunks" to "every view
//! overlapping a chunk, across all worlds".

use std::collections::{HashMap, HashSet};

use viewforge_types::{BlockPosition, ChunkKey, PlayerId, ViewId};

use crate::audience::Audience;
use crate::dispatcher::PacketDispatcher;
use crate::error::{ViewError, ViewResult};
use crate::host::PlayerHost;
use crate::view::BlockView;

#[derive(Default)]
pub struct ViewManager {
    views_by_id: HashMap<ViewId, BlockView>,
    chunk_index: HashMap<ChunkKey, HashSet<ViewId>>,
    player_visibility: HashMap<PlayerId, HashSet<ViewId>>,
    placeholder_ids: HashSet<ViewId>,
}

impl ViewManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `view` by every chunk its bounding box overlaps. Rejects
    /// placeholders and id collisions. A rejected placeholder's id is
    /// remembered so later lookups by id (e.g. `add_player_to_view`) can
    /// still report `IsPlaceholder` instead of "not found".
    pub fn register(&mut self, view: BlockView) -> ViewResult<()> {
        if view.view_type.is_placeholder() {
            self.placeholder_ids.insert(view.id);
            return Err(ViewError::IsPlaceholder);
        }
        if self.views_by_id.contains_key(&view.id) {
            return Err(ViewError::DuplicateView);
        }
        let id = view.id;
        for chunk in view.bbox.overlapping_chunks() {
            self.chunk_index.entry(chunk).or_default().insert(id);
        }
        self.views_by_id.insert(id, view);
        Ok(())
    }

    /// Removes `id` from every index it appears in and cascades `destroy`
    /// over every dig session still active or paused in the view, clearing
    /// their destroy-stage overlays. Any still-online audience members are
    /// otherwise left as-is client-side; callers that want a clean client
    /// reset of the overrides themselves should `reset()` the view before
    /// unregistering.
    pub fn unregister(&mut self, id: ViewId, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) -> Option<BlockView> {
        self.placeholder_ids.remove(&id);
        let mut view = self.views_by_id.remove(&id)?;
        for chunk in view.bbox.overlapping_chunks() {
            if let Some(ids) = self.chunk_index.get_mut(&chunk) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.chunk_index.remove(&chunk);
                }
            }
        }
        for visible in self.player_visibility.values_mut() {
            visible.remove(&id);
        }
        view.destroy_all_dig_sessions(players, dispatcher);
        Some(view)
    }

    pub fn get(&self, id: ViewId) -> Option<&BlockView> {
        self.views_by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut BlockView> {
        self.views_by_id.get_mut(&id)
    }

    /// Adds `player` to `view`'s audience and records the visibility edge;
    /// `apply` drives an immediate client sync.
    pub fn add_player_to_view(&mut self, player: PlayerId, id: ViewId, apply: bool, players: &dyn PlayerHost, dispatcher: &mut PacketDispatcher) -> ViewResult<()> {
        if self.placeholder_ids.contains(&id) {
            return Err(ViewError::IsPlaceholder);
        }
        let view = self.views_by_id.get_mut(&id).ok_or(ViewError::NoSuchBlock)?;
        view.add_audience(Audience::Player(player), apply, players, dispatcher)?;
        self.player_visibility.entry(player).or_default().insert(id);
        Ok(())
    }

    /// Removes `player` from `view`'s audience and the visibility edge;
    /// `reset` clears its client-side overlays first.
    pub fn remove_player_from_view(
        &mut self,
        player: PlayerId,
        id: ViewId,
        reset: bool,
        world: &dyn crate::host::WorldHost,
        players: &dyn PlayerHost,
        dispatcher: &mut PacketDispatcher,
    ) -> ViewResult<()> {
        if self.placeholder_ids.contains(&id) {
            return Err(ViewError::IsPlaceholder);
        }
        let view = self.views_by_id.get_mut(&id).ok_or(ViewError::NoSuchBlock)?;
        view.remove_audience(&Audience::Player(player), reset, world, players, dispatcher)?;
        if let Some(visible) = self.player_visibility.get_mut(&player) {
            visible.remove(&id);
        }
        Ok(())
    }

    pub fn views_in_chunk(&self, chunk: ChunkKey) -> Vec<ViewId> {
        self.chunk_index.get(&chunk).map(|ids| ids.iter().copied().collect()).unwrap_or_default()
    }

    pub fn views_in_chunk_for_player(&self, player: PlayerId, chunk: ChunkKey) -> Vec<ViewId> {
        let Some(visible) = self.player_visibility.get(&player) else { return Vec::new() };
        self.views_in_chunk(chunk).into_iter().filter(|id| visible.contains(id)).collect()
    }

    /// Looks up the enclosing chunk, then filters by `is_inside(pos)` on
    /// each candidate — not every view touching a chunk necessarily
    /// covers every cell in it.
    pub fn views_containing_block(&self, pos: &BlockPosition) -> Vec<ViewId> {
        self.views_in_chunk(pos.chunk_key())
            .into_iter()
            .filter(|id| self.views_by_id.get(id).map(|v| v.bbox.is_inside(pos)).unwrap_or(false))
            .collect()
    }

    pub fn views_visible_to_player_containing_block(&self, player: PlayerId, pos: &BlockPosition) -> Vec<ViewId> {
        let Some(visible) = self.player_visibility.get(&player) else { return Vec::new() };
        self.views_containing_block(pos).into_iter().filter(|id| visible.contains(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.views_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views_by_id.is_empty()
    }
}
