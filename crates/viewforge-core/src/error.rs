use thiserror::Error;
use viewforge_registry::RegistryError;

/// All error kinds the view engine raises. Every one is recovered locally
/// by the caller within the same tick — nothing here unwinds across a tick
/// boundary, matching spec.md §7.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("position is outside the view's bounding box")]
    OutOfBounds,
    #[error("no override exists at this cell")]
    NoSuchBlock,
    #[error(transparent)]
    CapacityExhausted(#[from] RegistryError),
    #[error("placeholder views cannot be registered or have audiences")]
    IsPlaceholder,
    #[error("a view with this id is already registered")]
    DuplicateView,
    #[error("caller is not the session's last damager")]
    Unauthorized,
    #[error("an event subscriber cancelled the action")]
    Cancelled,
}

pub type ViewResult<T> = Result<T, ViewError>;
