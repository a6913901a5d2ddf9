pub mod bus;
pub mod kinds;

pub use bus::EventBus;
pub use kinds::{
    EventKind, TriggerSource, ViewBlockBreak, ViewBlockDig, ViewBlockPlace, ViewBlockSet,
    ViewEvent,
};
