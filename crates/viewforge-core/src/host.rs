//! Collaborator contracts (spec.md §6). The view engine never owns a
//! socket, a chunk loader, or a tick loop — it is driven by, and sends
//! through, a host that implements these traits. Grounded on
//! `pickaxe-protocol-core::adapter::ProtocolAdapter`'s `Send + Sync`
//! trait-at-the-seam style.

use viewforge_types::{BlockPosition, ChunkKey, PlayerId};

/// Per-player digging context the host gathers once per tick: held tool,
/// active status effects, and environment. Spec.md §4.5 calls this a
/// single `break_context` bundle passed in by the game host.
#[derive(Debug, Clone, Default)]
pub struct BreakContext {
    /// Name of the item in the player's main hand, if any (e.g. `"pickaxe"`
    /// or a more specific identifier the host's tool table understands).
    pub main_hand_tool: Option<String>,
    pub haste_level: u8,
    pub mining_fatigue_level: u8,
    pub underwater: bool,
    pub airborne: bool,
}

impl BreakContext {
    /// Vanilla-shaped status speed multiplier: haste speeds mining up,
    /// mining fatigue slows it down (never past a dead stop), and being
    /// underwater or airborne both apply a flat slowdown — the same shape
    /// as the game's own digging speed formula.
    pub fn status_speed_multiplier(&self) -> f64 {
        let mut speed = 1.0 + 0.2 * self.haste_level as f64;
        speed *= (1.0 - 0.3 * self.mining_fatigue_level as f64).max(0.0);
        if self.underwater {
            speed /= 5.0;
        }
        if self.airborne {
            speed /= 5.0;
        }
        speed.max(0.0001)
    }
}

/// World-side facts the engine needs but never mutates: the authoritative
/// block underneath a view (for `reset`/`refresh_block` of unmanaged
/// cells) and material hardness for blocks the registry doesn't already
/// know about.
pub trait WorldHost: Send + Sync {
    /// The wire block-state id actually present in the authoritative world
    /// at `pos`, ignoring any view override.
    fn world_block_state(&self, pos: &BlockPosition) -> i32;

    /// Hardness and harvest tools for a material name not covered by the
    /// engine's built-in table, or `None` to fall back to it.
    fn material_hardness(&self, _material: &str) -> Option<(f64, Vec<String>)> {
        None
    }
}

/// Player-side facts: presence, per-player chunk loading state, and the
/// digging context.
pub trait PlayerHost: Send + Sync {
    fn is_online(&self, player: PlayerId) -> bool;

    /// Whether `player`'s client currently has `chunk` loaded. Block-change
    /// packets are only ever sent to players for whom this is true
    /// (spec.md §6).
    fn has_chunk_loaded(&self, player: PlayerId, chunk: ChunkKey) -> bool;

    fn break_context(&self, player: PlayerId) -> BreakContext;
}

/// A fire-and-forget packet transport keyed by player, not by raw
/// connection — the host owns connection resolution. No operation here may
/// block; a disconnected player is simply dropped by the host.
pub trait PacketSink: Send + Sync {
    fn send(&self, player: PlayerId, packet: crate::packet::ViewforgePacket);
}

/// Documents the scheduling contract (spec.md §5/§6): a host calls
/// `schedule_repeating` once at one-tick granularity to drive dig-session
/// ticks and dispatcher flushes, and once at a coarser period to drive
/// `DigManager::sync`. The engine itself never spawns a task or depends on
/// an async runtime — `Scheduler` exists purely so a host has a named seam
/// to implement against.
pub trait Scheduler: Send + Sync {
    /// Opaque handle returned to `cancel` a previously scheduled task.
    type Handle;

    fn schedule_repeating(
        &self,
        initial_ticks: u64,
        period_ticks: u64,
        is_async: bool,
        task: Box<dyn FnMut() + Send>,
    ) -> Self::Handle;

    fn cancel(&self, handle: Self::Handle);
}
