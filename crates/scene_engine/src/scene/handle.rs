//! Generation-checked handles into a scene's arenas.
//!
//! A handle is a `(scene id, slot key)` pair. The slot key carries a
//! generation, so once the slot is freed every copy of the handle fails to
//! resolve, and the scene id keeps a handle from one scene from aliasing a slot
//! in another.

use slotmap::new_key_type;
use std::sync::atomic::{AtomicU32, Ordering};

new_key_type! {
    /// Arena key of an object
    pub struct ObjectKey;
    /// Arena key of a component
    pub struct ComponentKey;
}

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique scene identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Weak handle to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub(crate) scene: SceneId,
    pub(crate) key: ObjectKey,
}

impl ObjectRef {
    pub(crate) fn new(scene: SceneId, key: ObjectKey) -> Self {
        Self { scene, key }
    }

    /// Scene this handle points into
    pub fn scene(&self) -> SceneId {
        self.scene
    }
}

/// Weak handle to a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub(crate) scene: SceneId,
    pub(crate) key: ComponentKey,
}

impl ComponentRef {
    pub(crate) fn new(scene: SceneId, key: ComponentKey) -> Self {
        Self { scene, key }
    }

    /// Scene this handle points into
    pub fn scene(&self) -> SceneId {
        self.scene
    }
}
