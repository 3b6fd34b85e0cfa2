//! Contact listeners and query results

use crate::foundation::math::Vec3;
use crate::foundation::reference::{SafeReferenceable, WeakReference};
use crate::scene::{ComponentRef, ObjectRef};
use std::sync::{RwLock, Weak};

/// Geometry of a contact, seen from the collider receiving the callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Contact point in world space
    pub point: Vec3,
    /// Normal pointing from the receiving collider towards the other one
    pub normal: Vec3,
    /// Penetration depth
    pub depth: f32,
}

/// Callback target notified when colliders start or stop touching.
///
/// Every begin is matched by exactly one end, including when one of the
/// colliders is destroyed while the pair is still touching.
pub trait ContactListener: Send + Sync {
    /// Two physical bodies started touching
    fn begin_contact(&mut self, _collider: ComponentRef, _other: ComponentRef, _info: &ContactInfo) {}

    /// Two physical bodies stopped touching
    fn end_contact(&mut self, _collider: ComponentRef, _other: ComponentRef) {}

    /// A sensor or phantom started overlapping another collider
    fn begin_overlap(&mut self, _collider: ComponentRef, _other: ComponentRef) {}

    /// A sensor or phantom stopped overlapping another collider
    fn end_overlap(&mut self, _collider: ComponentRef, _other: ComponentRef) {}
}

/// Weak handle to a listener as stored by colliders
pub type ListenerRef = WeakReference<dyn ContactListener>;

impl<T: ContactListener + 'static> SafeReferenceable<T> {
    /// Weak listener handle suitable for registering on a collider
    pub fn listener(&self) -> ListenerRef {
        let weak: Weak<RwLock<dyn ContactListener>> = self.downgrade();
        WeakReference::from_weak(weak)
    }
}

/// Nearest raycast hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayInfo {
    /// Collider that was hit
    pub collider: ComponentRef,
    /// Object owning the collider
    pub object: ObjectRef,
    /// Hit point in world space
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}
