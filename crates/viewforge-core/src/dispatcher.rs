//! Collects per-viewer packets across a game tick and flushes each
//! viewer's queue as one bundled frame (spec.md §4.7). Grounded on the
//! teacher's `tick_block_breaking` update-collection pass
//! (`pickaxe-server::tick`), generalised from a single-purpose `Vec` into
//! a dedup-by-key queue since this dispatcher serves every packet source
//! in the engine, not just destroy-stage updates.

use std::collections::HashMap;

use viewforge_types::{BlockPosition, PlayerId};

use crate::host::{PacketSink, PlayerHost};
use crate::packet::ViewforgePacket;

/// Identifies "the same logical update" for dedup purposes: a later
/// enqueue with the same key replaces the earlier packet in place rather
/// than appending a second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    BlockAt(BlockPosition),
    DestroyStageAt(BlockPosition),
    /// Packets with no natural collapse key (acks, multi-block bundles)
    /// are never deduplicated against each other.
    Unkeyed(u64),
}

#[derive(Default)]
struct ViewerQueue {
    order: Vec<DedupKey>,
    packets: HashMap<DedupKey, ViewforgePacket>,
    next_unkeyed: u64,
}

impl ViewerQueue {
    fn push(&mut self, key: DedupKey, packet: ViewforgePacket) {
        if !self.packets.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.packets.insert(key, packet);
    }

    fn drain(&mut self) -> Vec<ViewforgePacket> {
        let packets = self
            .order
            .drain(..)
            .filter_map(|key| self.packets.remove(&key))
            .collect();
        packets
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Default)]
pub struct PacketDispatcher {
    queues: HashMap<PlayerId, ViewerQueue>,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, player: PlayerId, packet: ViewforgePacket) {
        let queue = self.queues.entry(player).or_default();
        let key = match &packet {
            ViewforgePacket::BlockUpdate { pos, .. } => DedupKey::BlockAt(*pos),
            ViewforgePacket::SetBlockDestroyStage { pos, .. } => DedupKey::DestroyStageAt(*pos),
            _ => {
                let id = queue.next_unkeyed;
                queue.next_unkeyed += 1;
                DedupKey::Unkeyed(id)
            }
        };
        queue.push(key, packet);
    }

    pub fn enqueue_many(&mut self, player: PlayerId, packets: impl IntoIterator<Item = ViewforgePacket>) {
        for packet in packets {
            self.enqueue(player, packet);
        }
    }

    /// Delivers one bundle per viewer with pending packets, skipping
    /// offline players and players with nothing queued. Single-packet
    /// queues are sent unwrapped rather than as a one-element bundle.
    pub fn flush(&mut self, sink: &dyn PacketSink, hosts: &dyn PlayerHost) {
        let players: Vec<PlayerId> = self.queues.keys().copied().collect();
        for player in players {
            let Some(queue) = self.queues.get_mut(&player) else { continue };
            if queue.is_empty() {
                self.queues.remove(&player);
                continue;
            }
            let mut packets = queue.drain();
            self.queues.remove(&player);
            if !hosts.is_online(player) {
                continue;
            }
            if packets.len() == 1 {
                sink.send(player, packets.pop().unwrap());
            } else {
                sink.send(player, ViewforgePacket::Bundle(packets));
            }
        }
    }

    pub fn pending_count(&self, player: PlayerId) -> usize {
        self.queues.get(&player).map(|q| q.order.len()).unwrap_or(0)
    }
}
