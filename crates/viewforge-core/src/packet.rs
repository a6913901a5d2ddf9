//! The default packet shape `PacketSink` implementors reach for. Not a
//! required wire format — the core never inspects these beyond
//! constructing and handing them to `PacketSink::send` — but grounded on
//! `pickaxe-protocol-core::packets::InternalPacket`'s variant naming
//! (`BlockUpdate`, `SetBlockDestroyStage`, `AcknowledgeBlockChange`),
//! extended with the multi-block and bundle shapes spec.md §4.7/§6
//! requires that the teacher's enum does not carry.

use viewforge_types::BlockPosition;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewforgePacket {
    /// A single-cell block change (spec.md §4.2 `set`, single-viewer
    /// `refresh_block`).
    BlockUpdate {
        pos: BlockPosition,
        wire_state: i32,
    },
    /// One packet per occupied chunk section, carrying every changed cell
    /// in that chunk (spec.md §4.2 `set_many`, §4.2/§6 `apply`).
    MultiBlockChange {
        changes: Vec<(BlockPosition, i32)>,
    },
    /// `-1` clears the destroy overlay; `0..=9` draws progress.
    SetBlockDestroyStage {
        entity_id: i32,
        pos: BlockPosition,
        stage: i8,
    },
    /// Acknowledges a player-initiated dig/place action (wire-protocol
    /// bookkeeping; lets the client reconcile a cancelled action without
    /// resending its whole input sequence).
    AcknowledgeBlockChange {
        sequence: i32,
    },
    /// Spawns the synthetic "block entity" a destroy-stage overlay is
    /// keyed to. `entity_id` reuses the wire protocol's real-entity id
    /// space (spec.md §4.4) and must not be confused with one.
    SpawnFakeBlockEntity {
        entity_id: i32,
        pos: BlockPosition,
    },
    RemoveFakeBlockEntity {
        entity_id: i32,
    },
    /// A bundle of packets delivered to a viewer as a single frame
    /// (spec.md §4.7 `PacketDispatcher`).
    Bundle(Vec<ViewforgePacket>),
}
