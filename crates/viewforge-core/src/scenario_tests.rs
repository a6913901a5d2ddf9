//! End-to-end scenarios and the quantified invariants, run against
//! in-process fake hosts rather than a real world/connection.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use viewforge_events::{EventBus, EventKind, ViewEvent};
use viewforge_registry::{BlockDataRegistry, CustomBlockData, VanillaState, ViewBlockData};
use viewforge_types::{BlockPosition, BoundingBox, ChunkKey, PlayerId, ViewId, WorldId};

use crate::audience::Audience;
use crate::break_time::BreakTimeCalculator;
use crate::dispatcher::PacketDispatcher;
use crate::error::ViewError;
use crate::host::{BreakContext, PacketSink, PlayerHost};
use crate::options::{ViewOptions, ViewType};
use crate::packet::ViewforgePacket;
use crate::view::BlockView;
use crate::view_manager::ViewManager;

struct FakeWorld;

impl crate::host::WorldHost for FakeWorld {
    fn world_block_state(&self, _pos: &BlockPosition) -> i32 {
        0
    }
}

struct FakePlayers {
    online: RefCell<HashSet<PlayerId>>,
}

impl FakePlayers {
    fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self { online: RefCell::new(players.into_iter().collect()) }
    }
}

impl PlayerHost for FakePlayers {
    fn is_online(&self, player: PlayerId) -> bool {
        self.online.borrow().contains(&player)
    }

    fn has_chunk_loaded(&self, _player: PlayerId, _chunk: ChunkKey) -> bool {
        true
    }

    fn break_context(&self, _player: PlayerId) -> BreakContext {
        BreakContext::default()
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: RefCell<Vec<(PlayerId, ViewforgePacket)>>,
}

impl PacketSink for RecordingSink {
    fn send(&self, player: PlayerId, packet: ViewforgePacket) {
        self.sent.borrow_mut().push((player, packet));
    }
}

fn world() -> WorldId {
    WorldId::from_u128(1)
}

fn pid(n: u128) -> PlayerId {
    PlayerId::from_u128(n)
}

fn stone() -> ViewBlockData {
    ViewBlockData::Vanilla(VanillaState::new("minecraft:stone"))
}

#[allow(clippy::too_many_arguments)]
fn new_view(id: u64, origin: (i32, i32, i32), dims: (u32, u32, u32), registry: Arc<BlockDataRegistry>, events: Arc<EventBus>, calc: Arc<BreakTimeCalculator>) -> BlockView {
    BlockView::new(ViewId(id), BoundingBox::new(world(), origin, dims), ViewType::Transient, ViewOptions::default(), None, registry, events, calc)
}

// --- S1: single override visibility ---

#[test]
fn s1_single_override_visibility() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());

    let set_fired = Arc::new(RefCell::new(0usize));
    let set_fired_clone = set_fired.clone();
    events.register(EventKind::BlockSet, move |_| *set_fired_clone.borrow_mut() += 1);

    let mut view = new_view(1, (100, 64, 200), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    view.add_audience(Audience::Player(p1), false, &players, &mut dispatcher).unwrap();
    let pos = BlockPosition::new(world(), 101, 64, 201);
    view.set(pos, stone(), true, &players, &mut dispatcher).unwrap();

    let sink = RecordingSink::default();
    dispatcher.flush(&sink, &players);
    let sent = sink.sent.into_inner();

    assert_eq!(sent.len(), 1);
    match &sent[0] {
        (player, ViewforgePacket::BlockUpdate { pos: p, .. }) => {
            assert_eq!(*player, p1);
            assert_eq!(*p, pos);
        }
        other => panic!("unexpected packet: {other:?}"),
    }
    assert_eq!(*set_fired.borrow(), 1);
}

// --- S2: audience apply emits one chunk section ---

#[test]
fn s2_audience_apply_emits_chunk_section() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (100, 64, 200), (3, 3, 3), registry, events, calc);

    let p1 = pid(1);
    let p2 = pid(2);
    let players = FakePlayers::new([p1, p2]);
    let mut dispatcher = PacketDispatcher::new();

    view.add_audience(Audience::Player(p1), false, &players, &mut dispatcher).unwrap();
    let pos = BlockPosition::new(world(), 101, 64, 201);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();
    dispatcher.flush(&RecordingSink::default(), &players);

    view.add_audience(Audience::Player(p2), true, &players, &mut dispatcher).unwrap();
    let sink = RecordingSink::default();
    dispatcher.flush(&sink, &players);

    let sent = sink.sent.into_inner();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        (player, ViewforgePacket::MultiBlockChange { changes }) => {
            assert_eq!(*player, p2);
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].0, pos);
        }
        other => panic!("unexpected packet: {other:?}"),
    }
}

// --- copy: fresh id, caller-chosen type, same overrides ---

#[test]
fn copy_assigns_fresh_id_and_caller_chosen_type() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut original = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    original.view_type = ViewType::Persistent;

    let players = FakePlayers::new([]);
    let mut dispatcher = PacketDispatcher::new();
    let pos = BlockPosition::new(world(), 1, 1, 1);
    original.set(pos, stone(), false, &players, &mut dispatcher).unwrap();

    let copied = original.copy((10, 0, 0), ViewType::Transient);

    assert_ne!(copied.id, original.id);
    assert_eq!(copied.view_type, ViewType::Transient);
    let copied_pos = BlockPosition::new(world(), 11, 1, 1);
    assert_eq!(copied.get(&copied_pos).unwrap(), Some(stone()));
    assert!(copied.audiences().is_empty());
}

// --- S3: dig completion ---

#[test]
fn s3_dig_completion_emits_ten_stages_then_breaks() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());

    let break_seen = Arc::new(RefCell::new(None));
    let break_seen_clone = break_seen.clone();
    events.register(EventKind::BlockBreak, move |event| {
        if let ViewEvent::Break(e) = event {
            *break_seen_clone.borrow_mut() = Some((e.original.clone(), e.output.clone()));
        }
    });

    let mut view = new_view(1, (100, 64, 200), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();
    view.add_audience(Audience::Player(p1), false, &players, &mut dispatcher).unwrap();

    let pos = BlockPosition::new(world(), 101, 64, 202);
    let custom = ViewBlockData::Custom(CustomBlockData {
        material: "reinforced_stone".into(),
        hardness: 0.2,
        resumable: false,
        harvest_tools: vec![],
        wire_state: 42,
    });
    view.set(pos, custom.clone(), false, &players, &mut dispatcher).unwrap();

    let break_ctx = BreakContext::default();
    assert!(view.start_dig(p1, pos, &break_ctx, 1.0, 0).unwrap());

    let mut stages = Vec::new();
    for ms in (0..=1500).step_by(50) {
        let before_count = stages.len();
        view.dig_tick(ms, &players, &mut dispatcher);
        let sink = RecordingSink::default();
        dispatcher.flush(&sink, &players);
        for (_, packet) in sink.sent.into_inner() {
            if let ViewforgePacket::SetBlockDestroyStage { stage, .. } = packet {
                if stage >= 0 {
                    stages.push(stage);
                }
            }
        }
        let _ = before_count;
    }

    assert_eq!(stages, (0..=9).collect::<Vec<i8>>());
    let (original, output) = break_seen.borrow().clone().expect("break event fired");
    assert_eq!(original, custom);
    assert!(output.is_air());
    assert!(!view.is_managed(&pos) || view.get(&pos).unwrap().unwrap().is_air());
}

// --- S4: dig cancel and resume ---

#[test]
fn s4_dig_cancel_and_resume_completes_without_double_break() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());

    let break_count = Arc::new(RefCell::new(0usize));
    let break_count_clone = break_count.clone();
    events.register(EventKind::BlockBreak, move |_| *break_count_clone.borrow_mut() += 1);

    let mut view = new_view(1, (100, 64, 200), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 101, 64, 202);
    let custom = ViewBlockData::Custom(CustomBlockData {
        material: "reinforced_stone".into(),
        hardness: 0.2,
        resumable: true,
        harvest_tools: vec![],
        wire_state: 7,
    });
    view.set(pos, custom, false, &players, &mut dispatcher).unwrap();

    let break_ctx = BreakContext::default();
    assert!(view.start_dig(p1, pos, &break_ctx, 1.0, 0).unwrap());
    view.dig_tick(400, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    assert!(view.cancel_dig(pos, p1, 400, &players, &mut dispatcher));
    dispatcher.flush(&RecordingSink::default(), &players);

    assert!(view.start_dig(p1, pos, &break_ctx, 1.0, 400).unwrap());
    view.dig_tick(1_100, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    assert_eq!(*break_count.borrow(), 1);
}

// --- S5: cross-player authorisation ---

#[test]
fn s5_cross_player_complete_is_rejected() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());

    let mut view = new_view(1, (100, 64, 200), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let p2 = pid(2);
    let players = FakePlayers::new([p1, p2]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 101, 64, 201);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();

    let break_ctx = BreakContext::default();
    view.start_dig(p1, pos, &break_ctx, 1.0, 0).unwrap();

    let result = view.complete_dig(pos, p2, 0, true, &players, &mut dispatcher);
    assert_eq!(result, Err(ViewError::Unauthorized));
}

// --- S6: placeholder rejection ---

#[test]
fn s6_placeholder_rejected_by_manager() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());

    let mut view = new_view(1, (0, 0, 0), (1, 1, 1), registry, events, calc);
    view.view_type = ViewType::Placeholder;

    let mut manager = ViewManager::new();
    let id = view.id;
    assert_eq!(manager.register(view), Err(ViewError::IsPlaceholder));

    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();
    assert_eq!(
        manager.add_player_to_view(p1, id, false, &players, &mut dispatcher),
        Err(ViewError::IsPlaceholder)
    );
}

// --- Invariant 1: override round-trip ---

#[test]
fn invariant_override_round_trip() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let players = FakePlayers::new([]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();
    assert_eq!(view.get(&pos).unwrap(), Some(stone()));
}

// --- Invariant 2: chunk-index completeness ---

#[test]
fn invariant_chunk_index_completeness() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let view = new_view(1, (8, 0, 8), (16, 4, 16), registry, events, calc);
    let id = view.id;
    let chunks = view.bbox.overlapping_chunks();

    let mut manager = ViewManager::new();
    manager.register(view).unwrap();
    for chunk in &chunks {
        assert!(manager.views_in_chunk(*chunk).contains(&id));
    }
    let players = FakePlayers::new([]);
    let mut dispatcher = PacketDispatcher::new();
    manager.unregister(id, &players, &mut dispatcher);
    for chunk in &chunks {
        assert!(!manager.views_in_chunk(*chunk).contains(&id));
    }
}

// --- unregister cascades destroy over in-flight dig sessions ---

#[test]
fn unregister_clears_overlays_for_in_flight_digs() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let id = view.id;
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();
    view.start_dig(p1, pos, &BreakContext::default(), 1.0, 0).unwrap();
    view.dig_tick(400, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    let mut manager = ViewManager::new();
    manager.register(view).unwrap();
    manager.unregister(id, &players, &mut dispatcher);

    let sink = RecordingSink::default();
    dispatcher.flush(&sink, &players);
    let clears: Vec<_> = sink
        .sent
        .into_inner()
        .into_iter()
        .filter(|(_, p)| matches!(p, ViewforgePacket::SetBlockDestroyStage { stage: -1, .. }))
        .collect();
    assert_eq!(clears.len(), 1);
}

// --- Invariant 3: visibility consistency ---

#[test]
fn invariant_visibility_consistency() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let view = new_view(1, (0, 0, 0), (2, 2, 2), registry, events, calc);
    let id = view.id;

    let mut manager = ViewManager::new();
    manager.register(view).unwrap();

    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();
    manager.add_player_to_view(p1, id, false, &players, &mut dispatcher).unwrap();

    assert!(manager.get(id).unwrap().audiences().iter().any(|a| a.contains(p1)));
    assert!(manager.views_in_chunk_for_player(p1, ChunkKey::new(world(), 0, 0)).contains(&id));
}

// --- Invariant 4: dig stage monotonicity ---

#[test]
fn invariant_dig_stage_monotonicity() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    let custom = ViewBlockData::Custom(CustomBlockData {
        material: "stone".into(),
        hardness: 1.0,
        resumable: false,
        harvest_tools: vec![],
        wire_state: 1,
    });
    view.set(pos, custom, false, &players, &mut dispatcher).unwrap();
    view.start_dig(p1, pos, &BreakContext::default(), 1.0, 0).unwrap();

    let mut last_stage = -1i8;
    let mut strictly_increased = false;
    for ms in (0..=1500).step_by(50) {
        view.dig_tick(ms, &players, &mut dispatcher);
        let sink = RecordingSink::default();
        dispatcher.flush(&sink, &players);
        for (_, packet) in sink.sent.into_inner() {
            if let ViewforgePacket::SetBlockDestroyStage { stage, .. } = packet {
                assert!(stage >= last_stage);
                if stage > last_stage {
                    strictly_increased = true;
                }
                last_stage = stage;
            }
        }
    }
    assert!(strictly_increased);
}

// --- break_block clears a stale destroy-stage overlay ---

#[test]
fn break_block_clears_in_flight_dig_overlay() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();
    view.start_dig(p1, pos, &BreakContext::default(), 1.0, 0).unwrap();
    view.dig_tick(400, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    view.break_block(None, pos, false, false, TriggerSource::Script, &players, &mut dispatcher).unwrap();
    let sink = RecordingSink::default();
    dispatcher.flush(&sink, &players);

    let clears: Vec<_> = sink
        .sent
        .into_inner()
        .into_iter()
        .filter(|(_, p)| matches!(p, ViewforgePacket::SetBlockDestroyStage { stage: -1, .. }))
        .collect();
    assert_eq!(clears.len(), 1);
}

// --- Invariant 5: dig pause idempotence ---

#[test]
fn invariant_simulate_partial_break_is_idempotent() {
    use crate::dig::DigManager;

    let mut manager = DigManager::new();
    let p1 = pid(1);
    let pos = BlockPosition::new(world(), 0, 0, 0);

    manager.simulate_partial_break(p1, pos, 0.5, 1000.0);
    let after_first = manager.record_count();
    manager.simulate_partial_break(p1, pos, 0.5, 1000.0);
    let after_second = manager.record_count();
    assert_eq!(after_first, after_second);
}

// --- Invariant 6: resumability law ---

#[test]
fn invariant_resumability_law_non_resumable_resets_progress() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    let custom = ViewBlockData::Custom(CustomBlockData {
        material: "stone".into(),
        hardness: 1.0,
        resumable: false,
        harvest_tools: vec![],
        wire_state: 1,
    });
    view.set(pos, custom, false, &players, &mut dispatcher).unwrap();
    view.start_dig(p1, pos, &BreakContext::default(), 1.0, 0).unwrap();
    view.dig_tick(400, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    assert!(view.cancel_dig(pos, p1, 400, &players, &mut dispatcher));
    assert_eq!(view.dig_progress_ms(&pos), 0.0);
    assert!(view.start_dig(p1, pos, &BreakContext::default(), 1.0, 400).unwrap());
}

// --- Invariant 6, resumable branch: cancel retains progress ---

#[test]
fn invariant_resumability_law_resumable_retains_progress() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    let custom = ViewBlockData::Custom(CustomBlockData {
        material: "stone".into(),
        hardness: 1.0,
        resumable: true,
        harvest_tools: vec![],
        wire_state: 1,
    });
    view.set(pos, custom, false, &players, &mut dispatcher).unwrap();
    view.start_dig(p1, pos, &BreakContext::default(), 1.0, 0).unwrap();
    view.dig_tick(400, &players, &mut dispatcher);
    dispatcher.flush(&RecordingSink::default(), &players);

    assert!(view.cancel_dig(pos, p1, 400, &players, &mut dispatcher));
    assert_eq!(view.dig_progress_ms(&pos), 400.0);
}

// --- Invariant 7: authorisation ---

#[test]
fn invariant_authorisation_is_a_no_op_for_wrong_player() {
    use crate::dig::DigManager;

    let mut manager = DigManager::new();
    let p1 = pid(1);
    let p2 = pid(2);
    let pos = BlockPosition::new(world(), 0, 0, 0);
    manager.start(p1, pos, 1000.0, 1.0, 0);
    assert!(manager.complete(pos, p2, 500).is_none());
    assert!(manager.has_active_session(&pos));
}

// --- Invariant 8: audience symmetry ---

#[test]
fn invariant_audience_symmetry_apply_and_reset_balance() {
    let registry = Arc::new(BlockDataRegistry::new());
    let events = Arc::new(EventBus::new());
    let calc = Arc::new(BreakTimeCalculator::default());
    let mut view = new_view(1, (0, 0, 0), (3, 3, 3), registry, events, calc);
    let p1 = pid(1);
    let players = FakePlayers::new([p1]);
    let mut dispatcher = PacketDispatcher::new();

    let pos = BlockPosition::new(world(), 1, 1, 1);
    view.set(pos, stone(), false, &players, &mut dispatcher).unwrap();
    dispatcher.flush(&RecordingSink::default(), &players);

    let audience = Audience::Player(p1);
    view.add_audience(audience.clone(), true, &players, &mut dispatcher).unwrap();
    let apply_sink = RecordingSink::default();
    dispatcher.flush(&apply_sink, &players);
    let apply_sent = apply_sink.sent.into_inner();

    view.remove_audience(&audience, true, &FakeWorld, &players, &mut dispatcher).unwrap();
    let reset_sink = RecordingSink::default();
    dispatcher.flush(&reset_sink, &players);
    let reset_sent = reset_sink.sent.into_inner();

    assert_eq!(apply_sent.len(), reset_sent.len());
    assert!(matches!(apply_sent[0].1, ViewforgePacket::MultiBlockChange { .. }));
    assert!(matches!(reset_sent[0].1, ViewforgePacket::MultiBlockChange { .. }));
}

// --- Invariant 9: registry stability ---

#[test]
fn invariant_registry_stability_for_equal_serialisations() {
    let registry = BlockDataRegistry::new();
    let a = ViewBlockData::Vanilla(VanillaState::new("minecraft:chest"));
    let b = ViewBlockData::Vanilla(VanillaState::new("minecraft:chest"));
    assert_eq!(a.serialize(), b.serialize());
    assert_eq!(registry.intern(a).unwrap(), registry.intern(b).unwrap());
}
