use std::collections::HashMap;
use std::sync::RwLock;

use crate::block_data::ViewBlockData;
use crate::error::RegistryError;

/// Reserved id pre-bound to `ViewBlockData::air()`. Never assigned by
/// `intern`.
pub const AIR_ID: i16 = -1;

/// At most this many distinct non-air serialisations may be interned per
/// registry instance (16-bit signed ids, positive half only).
pub const MAX_IDS: usize = 32_767;

struct RegistryState {
    serial_to_id: HashMap<String, i16>,
    id_to_value: Vec<ViewBlockData>,
}

impl RegistryState {
    fn fresh() -> Self {
        let mut serial_to_id = HashMap::new();
        serial_to_id.insert(ViewBlockData::air().serialize(), AIR_ID);
        Self {
            serial_to_id,
            id_to_value: Vec::new(),
        }
    }
}

/// Interns `ViewBlockData` values to 16-bit identifiers so views can store
/// overrides as a compact id rather than the full value. Bidirectional:
/// `serialized_string <-> short_id`.
///
/// All operations take `&self` and lock internally, so the registry may be
/// shared across the game-tick domain without the caller managing a lock.
pub struct BlockDataRegistry {
    state: RwLock<RegistryState>,
}

impl BlockDataRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::fresh()),
        }
    }

    /// Returns the existing id for `value`'s canonical serialisation, or
    /// assigns the next monotonic id. Fails with `CapacityExhausted` once
    /// `MAX_IDS` distinct non-air values have been interned.
    pub fn intern(&self, value: ViewBlockData) -> Result<i16, RegistryError> {
        let key = value.serialize();

        {
            let state = self.state.read().unwrap();
            if let Some(&id) = state.serial_to_id.get(&key) {
                return Ok(id);
            }
        }

        let mut state = self.state.write().unwrap();
        // Re-check: another writer may have interned the same value while
        // we waited for the write lock.
        if let Some(&id) = state.serial_to_id.get(&key) {
            return Ok(id);
        }
        if state.id_to_value.len() >= MAX_IDS {
            tracing::warn!(%key, "registry capacity exhausted, refusing to intern");
            return Err(RegistryError::CapacityExhausted);
        }
        let id = state.id_to_value.len() as i16;
        state.id_to_value.push(value);
        state.serial_to_id.insert(key, id);
        Ok(id)
    }

    /// Constant-time reverse lookup. `AIR_ID` always resolves even right
    /// after `clear()`.
    pub fn lookup(&self, id: i16) -> Option<ViewBlockData> {
        if id == AIR_ID {
            return Some(ViewBlockData::air());
        }
        let state = self.state.read().unwrap();
        state.id_to_value.get(id as usize).cloned()
    }

    /// Empties both directions, resets the id counter, and re-binds AIR.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        *state = RegistryState::fresh();
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().id_to_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BlockDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}
