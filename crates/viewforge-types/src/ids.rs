use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for a world. Worlds are owned by the host; the engine only
/// ever compares and hashes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }
}

/// A player identity, used as the key for visibility sets and dig
/// attribution (`DigRecord::last_damager`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }
}

/// Opaque, process-unique identifier for a `BlockView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(pub u64);
