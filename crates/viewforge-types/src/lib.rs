pub mod geometry;
pub mod ids;
pub mod position;

pub use geometry::BoundingBox;
pub use ids::{PlayerId, ViewId, WorldId};
pub use position::{BlockPosition, ChunkKey, RelativePos};
