//! Asset access: file loaders, background loading and serialization flags

mod loader;
mod serialize_info;

pub use loader::{load_bytes, AsyncLoader, FileLoader, FsLoader, LoadCompletion, LoadTicket, MemoryLoader};
pub use serialize_info::SerializeInfo;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// No loader could find the file
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The file exists but could not be read
    #[error("Failed to read asset: {0}")]
    ReadFailed(String),

    /// The background loader has shut down
    #[error("Asset loader is not running")]
    LoaderStopped,
}
