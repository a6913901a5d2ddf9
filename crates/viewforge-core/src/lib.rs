//! Synthesizes per-player block overrides on top of the authoritative
//! world without mutating it: bounded views holding sparse override
//! tables, a chunk-indexed manager, timed dig sessions, and a dispatcher
//! that bundles outgoing packets per viewer per tick.

pub mod audience;
pub mod break_time;
pub mod config;
pub mod dig;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod options;
pub mod packet;
pub mod view;
pub mod view_manager;

pub use audience::Audience;
pub use break_time::{BreakTimeCalculator, PreferredToolModifier, ToolBreakSpeedModifier};
pub use config::EngineConfig;
pub use dig::{DigManager, DigOutcome};
pub use dispatcher::PacketDispatcher;
pub use error::{ViewError, ViewResult};
pub use host::{BreakContext, PacketSink, PlayerHost, Scheduler, WorldHost};
pub use options::{BreakMode, PlaceMode, UnmanagedBlockBehavior, ViewOptions, ViewType};
pub use packet::ViewforgePacket;
pub use view::BlockView;
pub use view_manager::ViewManager;

pub use viewforge_events::{
    EventBus, EventKind, TriggerSource, ViewBlockBreak, ViewBlockDig, ViewBlockPlace,
    ViewBlockSet, ViewEvent,
};
pub use viewforge_registry::{BlockDataRegistry, CustomBlockData, VanillaState, ViewBlockData};
pub use viewforge_types::{BlockPosition, BoundingBox, ChunkKey, PlayerId, RelativePos, ViewId, WorldId};

#[cfg(test)]
mod scenario_tests;
