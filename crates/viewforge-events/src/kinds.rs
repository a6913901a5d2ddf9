use viewforge_registry::ViewBlockData;
use viewforge_types::{BlockPosition, PlayerId, ViewId};

/// The cause of a view block break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    Player,
    Effect,
    Command,
    Script,
}

/// Non-cancellable: fired after a `BlockView::set` commits.
#[derive(Debug, Clone)]
pub struct ViewBlockSet {
    pub view: ViewId,
    pub pos: BlockPosition,
    pub data: ViewBlockData,
}

/// Cancellable: fired before a `BlockView::break_block` commits. `output`
/// is mutable — subscribers may redirect what the cell becomes after the
/// break (default: AIR).
#[derive(Debug, Clone)]
pub struct ViewBlockBreak {
    pub view: ViewId,
    pub player: Option<PlayerId>,
    pub pos: BlockPosition,
    pub original: ViewBlockData,
    pub output: ViewBlockData,
    pub trigger_source: TriggerSource,
    pub cancelled: bool,
}

impl ViewBlockBreak {
    /// `trigger_source == Player` — the spec treats `Player` as the default
    /// "player-triggered" cause.
    pub fn is_player_triggered(&self) -> bool {
        matches!(self.trigger_source, TriggerSource::Player)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Cancellable: fired before a block is placed into a view.
#[derive(Debug, Clone)]
pub struct ViewBlockPlace {
    pub view: ViewId,
    pub player: Option<PlayerId>,
    pub pos: BlockPosition,
    pub data: ViewBlockData,
    pub placed_against: Option<BlockPosition>,
    pub cancelled: bool,
}

impl ViewBlockPlace {
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Emitted once per stage transition during a dig session. `stage` is
/// mutable; subscribers' writes are clamped to `[-1, 9]` and observed by
/// later subscribers in the same dispatch.
#[derive(Debug, Clone)]
pub struct ViewBlockDig {
    pub view: ViewId,
    pub player: PlayerId,
    pub pos: BlockPosition,
    pub data: ViewBlockData,
    pub stage: i8,
}

impl ViewBlockDig {
    pub fn set_stage(&mut self, stage: i8) {
        self.stage = stage.clamp(-1, 9);
    }
}

/// The discriminant used to route dispatch to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BlockSet,
    BlockBreak,
    BlockPlace,
    BlockDig,
}

/// A typed union of every event the view engine can emit.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    Set(ViewBlockSet),
    Break(ViewBlockBreak),
    Place(ViewBlockPlace),
    Dig(ViewBlockDig),
}

impl ViewEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewEvent::Set(_) => EventKind::BlockSet,
            ViewEvent::Break(_) => EventKind::BlockBreak,
            ViewEvent::Place(_) => EventKind::BlockPlace,
            ViewEvent::Dig(_) => EventKind::BlockDig,
        }
    }

    /// `false` for non-cancellable kinds (`Set`).
    pub fn is_cancelled(&self) -> bool {
        match self {
            ViewEvent::Break(e) => e.cancelled,
            ViewEvent::Place(e) => e.cancelled,
            ViewEvent::Set(_) | ViewEvent::Dig(_) => false,
        }
    }

    pub fn as_break(&self) -> Option<&ViewBlockBreak> {
        match self {
            ViewEvent::Break(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_dig(&self) -> Option<&ViewBlockDig> {
        match self {
            ViewEvent::Dig(e) => Some(e),
            _ => None,
        }
    }
}
