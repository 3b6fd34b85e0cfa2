//! Serialization flags carried by objects and resources.
//!
//! The engine stores these but never acts on them; a serializer reads them
//! to decide what to write.

use serde::{Deserialize, Serialize};

/// Serialization flags carried by objects and resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializeInfo {
    /// Package the item belongs to
    pub package: u16,
    /// Whether the item is written at all
    pub should_serialize: bool,
    /// Whether a reduced form is enough
    pub light: bool,
}

impl Default for SerializeInfo {
    fn default() -> Self {
        Self {
            package: 0,
            should_serialize: true,
            light: false,
        }
    }
}
