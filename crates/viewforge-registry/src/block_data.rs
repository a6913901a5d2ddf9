use std::collections::BTreeMap;

use crate::material;

/// A single overridden block: either a vanilla block state or a fully
/// custom block description. Variant dispatch replaces the virtual-call
/// hierarchy the source expresses as a sealed class tree (spec.md §9).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewBlockData {
    Vanilla(VanillaState),
    Custom(CustomBlockData),
}

/// A vanilla block state: a namespaced block name plus its state
/// properties (e.g. `facing=north`), ordered for stable serialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanillaState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl VanillaState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A fully custom block: not backed by any vanilla block state, but still
/// sent to the client as one (`to_wire_state`).
#[derive(Debug, Clone, PartialEq)]
pub struct CustomBlockData {
    pub material: String,
    pub hardness: f64,
    pub resumable: bool,
    pub harvest_tools: Vec<String>,
    pub wire_state: i32,
}

impl ViewBlockData {
    /// The reserved AIR value, pre-bound to `BlockDataRegistry::AIR_ID`.
    pub fn air() -> Self {
        ViewBlockData::Vanilla(VanillaState::new("minecraft:air"))
    }

    pub fn is_air(&self) -> bool {
        matches!(self, ViewBlockData::Vanilla(v) if v.name == "minecraft:air")
    }

    /// Canonical string used as the registry key. Two values whose
    /// serialisation is equal must intern to the same id.
    pub fn serialize(&self) -> String {
        match self {
            ViewBlockData::Vanilla(state) => {
                let mut out = format!("vanilla:{}", state.name);
                for (k, v) in &state.properties {
                    out.push(';');
                    out.push_str(k);
                    out.push('=');
                    out.push_str(v);
                }
                out
            }
            ViewBlockData::Custom(custom) => format!(
                "custom:{};hardness={};resumable={};wire={};tools={}",
                custom.material,
                custom.hardness,
                custom.resumable,
                custom.wire_state,
                custom.harvest_tools.join(",")
            ),
        }
    }

    /// Base hardness, consulting the material table for vanilla states.
    /// Unknown vanilla names are treated as unbreakable (`f64::INFINITY`)
    /// rather than silently diggable.
    pub fn hardness(&self) -> f64 {
        match self {
            ViewBlockData::Vanilla(state) => material::lookup(&state.name)
                .map(|(h, _)| h)
                .unwrap_or(f64::INFINITY),
            ViewBlockData::Custom(custom) => custom.hardness,
        }
    }

    /// Vanilla block data is not resumable by default; custom blocks carry
    /// their own flag.
    pub fn resumable(&self) -> bool {
        match self {
            ViewBlockData::Vanilla(_) => false,
            ViewBlockData::Custom(custom) => custom.resumable,
        }
    }

    /// Whether `tool` is a preferred/harvesting tool for this block.
    pub fn preferred_tool(&self, tool: &str) -> bool {
        match self {
            ViewBlockData::Vanilla(state) => material::lookup(&state.name)
                .map(|(_, tools)| tools.contains(&tool))
                .unwrap_or(false),
            ViewBlockData::Custom(custom) => {
                custom.harvest_tools.iter().any(|t| t == tool)
            }
        }
    }

    /// Alias kept for custom blocks' spec-named accessor
    /// (`harvestable_by(tool) -> bool`); identical to `preferred_tool`.
    pub fn harvestable_by(&self, tool: &str) -> bool {
        self.preferred_tool(tool)
    }

    /// The block state id sent to the client.
    pub fn to_wire_state(&self) -> i32 {
        match self {
            ViewBlockData::Vanilla(state) => {
                if state.name == "minecraft:air" {
                    0
                } else {
                    // A real host resolves this through its block-state
                    // registry; lacking one, fall back to a stable hash so
                    // tests and callers still observe distinct values.
                    stable_hash(&self.serialize())
                }
            }
            ViewBlockData::Custom(custom) => custom.wire_state,
        }
    }
}

fn stable_hash(s: &str) -> i32 {
    let mut h: u32 = 2166136261;
    for b in s.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    (h & 0x7FFF_FFFF) as i32
}
