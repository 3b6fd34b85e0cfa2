//! Scene graph node

use super::graph::Graph;
use super::handle::{ComponentKey, ObjectKey, ObjectRef, SceneId};
use crate::assets::SerializeInfo;
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use bitflags::bitflags;
use nalgebra::Unit;
use std::cell::Cell;
use std::collections::BTreeSet;

bitflags! {
    /// Object state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u8 {
        /// Updated and drawn
        const ACTIVE = 1 << 0;
        /// World transform equals the local transform
        const IGNORE_PARENT = 1 << 1;
        /// Marked for destruction at the next sweep
        const PENDING_REMOVAL = 1 << 2;
    }
}

/// Lifecycle state of an object, as seen through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectState {
    /// Updated and drawn
    Active,
    /// Kept in the tree but skipped by update and draw
    Inactive,
    /// Destroyed at the next sweep
    PendingRemoval,
    /// Gone; every handle to it is expired
    Destroyed,
}

/// Scene graph node.
///
/// Owns its children and components through the scene arenas. The world
/// matrix is cached and recomputed on first access after this object or an
/// ancestor changed.
#[derive(Debug)]
pub struct Object {
    pub(crate) name: String,
    pub(crate) local: Transform,
    world: Cell<Mat4>,
    dirty: Cell<bool>,
    pub(crate) flags: ObjectFlags,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) serialize_info: SerializeInfo,
    pub(crate) parent: Option<ObjectKey>,
    pub(crate) children: Vec<ObjectKey>,
    pub(crate) components: Vec<ComponentKey>,
}

impl Object {
    pub(crate) fn new(name: String, parent: Option<ObjectKey>, flags: ObjectFlags) -> Self {
        Self {
            name,
            local: Transform::identity(),
            world: Cell::new(Mat4::identity()),
            dirty: Cell::new(true),
            flags,
            tags: BTreeSet::new(),
            serialize_info: SerializeInfo::default(),
            parent,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Name, unique among live siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transform relative to the parent
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.local.position
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Raw state flags
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// Whether the object takes part in updates and drawing
    pub fn is_active(&self) -> bool {
        self.flags.contains(ObjectFlags::ACTIVE)
    }

    /// Whether the world transform skips the parent chain
    pub fn ignores_parent(&self) -> bool {
        self.flags.contains(ObjectFlags::IGNORE_PARENT)
    }

    /// Lifecycle state derived from the flags
    pub fn state(&self) -> ObjectState {
        if self.flags.contains(ObjectFlags::PENDING_REMOVAL) {
            ObjectState::PendingRemoval
        } else if self.is_active() {
            ObjectState::Active
        } else {
            ObjectState::Inactive
        }
    }

    /// Tags in no particular order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Whether the object carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Serialization flags
    pub fn serialize_info(&self) -> &SerializeInfo {
        &self.serialize_info
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub(crate) fn cached_world(&self) -> Mat4 {
        self.world.get()
    }

    pub(crate) fn store_world(&self, world: Mat4) {
        self.world.set(world);
        self.dirty.set(false);
    }
}

/// Chaining view for mutating one object's local state.
///
/// Every transform setter invalidates the cached world matrix of the object
/// and its descendants.
pub struct ObjectMut<'a> {
    pub(crate) graph: &'a mut Graph,
    pub(crate) scene: SceneId,
    pub(crate) key: ObjectKey,
}

impl ObjectMut<'_> {
    fn object(&mut self) -> &mut Object {
        &mut self.graph.objects[self.key]
    }

    fn touched(&mut self) -> &mut Self {
        self.graph.invalidate(self.key);
        self
    }

    /// Handle of the object being edited
    pub fn handle(&self) -> ObjectRef {
        ObjectRef::new(self.scene, self.key)
    }

    /// Read access to the object
    pub fn get(&self) -> &Object {
        &self.graph.objects[self.key]
    }

    /// Set the local position
    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.object().local.position = position;
        self.touched()
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.object().local.rotation = rotation;
        self.touched()
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.object().local.scale = scale;
        self.touched()
    }

    /// Same scale on every axis
    pub fn set_uniform_scale(&mut self, scale: f32) -> &mut Self {
        self.set_scale(Vec3::new(scale, scale, scale))
    }

    /// Replace the whole local transform
    pub fn set_transform(&mut self, transform: Transform) -> &mut Self {
        self.object().local = transform;
        self.touched()
    }

    /// Translate in parent space
    pub fn move_by(&mut self, offset: Vec3) -> &mut Self {
        self.object().local.position += offset;
        self.touched()
    }

    /// Rotate in local space
    pub fn rotate_by(&mut self, rotation: Quat) -> &mut Self {
        let object = self.object();
        object.local.rotation *= rotation;
        self.touched()
    }

    /// Rotate around a local axis by `angle` radians
    pub fn rotate_axis(&mut self, axis: Vec3, angle: f32) -> &mut Self {
        match Unit::try_new(axis, f32::EPSILON) {
            Some(axis) => self.rotate_by(Quat::from_axis_angle(&axis, angle)),
            None => self,
        }
    }

    /// Multiply the scale per axis
    pub fn scale_by(&mut self, factor: Vec3) -> &mut Self {
        let object = self.object();
        object.local.scale = object.local.scale.component_mul(&factor);
        self.touched()
    }

    /// Turn the forward axis toward `target`, given in parent space
    pub fn look_at(&mut self, target: Vec3, up: Vec3) -> &mut Self {
        let direction = target - self.get().local.position;
        if direction.norm_squared() <= f32::EPSILON || direction.cross(&up).norm_squared() <= f32::EPSILON {
            return self;
        }
        self.set_rotation(Quat::face_towards(&-direction, &up))
    }

    /// Add a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.object().tags.insert(tag.into());
        self
    }

    /// Remove a tag if present
    pub fn remove_tag(&mut self, tag: &str) -> &mut Self {
        self.object().tags.remove(tag);
        self
    }

    /// Remove every tag
    pub fn clear_tags(&mut self) -> &mut Self {
        self.object().tags.clear();
        self
    }

    /// Replace the serialization flags
    pub fn set_serialize_info(&mut self, info: SerializeInfo) -> &mut Self {
        self.object().serialize_info = info;
        self
    }
}
