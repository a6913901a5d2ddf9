pub mod block_data;
pub mod error;
pub mod material;
pub mod registry;

pub use block_data::{CustomBlockData, VanillaState, ViewBlockData};
pub use error::RegistryError;
pub use registry::{BlockDataRegistry, AIR_ID, MAX_IDS};
