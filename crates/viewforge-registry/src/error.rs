use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry id space exhausted (32767 distinct entries already interned)")]
    CapacityExhausted,
}
