//! Object and component arenas with the world transform cache

use super::component::{Component, ComponentKind};
use super::handle::{ComponentKey, ObjectKey};
use super::object::{Object, ObjectFlags};
use crate::foundation::math::Mat4;
use slotmap::SlotMap;

/// Name of the implicit root object
pub(crate) const ROOT_NAME: &str = "root";

/// Path separator used by `find_by_path`
pub(crate) const PATH_SEPARATOR: char = '>';

pub(crate) struct Graph {
    pub(crate) objects: SlotMap<ObjectKey, Object>,
    pub(crate) components: SlotMap<ComponentKey, Component>,
    pub(crate) root: ObjectKey,
}

impl Graph {
    pub(crate) fn new() -> Self {
        let mut objects = SlotMap::with_key();
        let root = objects.insert(Object::new(ROOT_NAME.to_string(), None, ObjectFlags::ACTIVE));
        Self {
            objects,
            components: SlotMap::with_key(),
            root,
        }
    }

    /// World matrix of `key`, recomputing dirty ancestors on the way.
    ///
    /// A clean object always has clean ancestors, so the walk stops at the
    /// first clean one.
    pub(crate) fn world_matrix(&self, key: ObjectKey) -> Mat4 {
        let Some(object) = self.objects.get(key) else {
            return Mat4::identity();
        };
        if !object.is_dirty() {
            return object.cached_world();
        }
        let local = object.local.to_matrix();
        let world = match object.parent {
            Some(parent) if !object.ignores_parent() => self.world_matrix(parent) * local,
            _ => local,
        };
        object.store_world(world);
        world
    }

    /// Mark `key` and its descendants dirty. Descendants of a dirty object are
    /// already dirty.
    pub(crate) fn invalidate(&self, key: ObjectKey) {
        let Some(object) = self.objects.get(key) else { return };
        if object.is_dirty() {
            return;
        }
        object.mark_dirty();
        for child in &object.children {
            self.invalidate(*child);
        }
    }

    pub(crate) fn object_live(&self, key: ObjectKey) -> bool {
        self.objects.get(key).is_some_and(|object| {
            object.flags.contains(ObjectFlags::ACTIVE) && !object.flags.contains(ObjectFlags::PENDING_REMOVAL)
        })
    }

    /// Active, not pending removal, on a live owner
    pub(crate) fn component_live(&self, key: ComponentKey) -> bool {
        self.components
            .get(key)
            .is_some_and(|c| c.active && !c.pending_removal && self.object_live(c.owner))
    }

    /// Whether `ancestor` is `key` or one of its ancestors
    pub(crate) fn is_self_or_ancestor(&self, ancestor: ObjectKey, key: ObjectKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.objects.get(k).and_then(|o| o.parent);
        }
        false
    }

    /// `key` and all its descendants, parents before children
    pub(crate) fn subtree(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(object) = self.objects.get(k) {
                out.push(k);
                stack.extend(object.children.iter().rev());
            }
        }
        out
    }

    /// Direct child named `name` that is not pending removal
    pub(crate) fn find_child(&self, parent: ObjectKey, name: &str) -> Option<ObjectKey> {
        self.objects.get(parent)?.children.iter().copied().find(|child| {
            self.objects
                .get(*child)
                .is_some_and(|o| o.name == name && !o.flags.contains(ObjectFlags::PENDING_REMOVAL))
        })
    }

    /// Behaviour components of live objects in traversal order. Subtrees
    /// below an object that is not live are skipped.
    pub(crate) fn live_behaviours(&self) -> Vec<ComponentKey> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            if !self.object_live(key) {
                continue;
            }
            let Some(object) = self.objects.get(key) else { continue };
            out.extend(object.components.iter().copied().filter(|c| {
                self.component_live(*c)
                    && self
                        .components
                        .get(*c)
                        .is_some_and(|component| matches!(component.kind, ComponentKind::Behaviour(_)))
            }));
            stack.extend(object.children.iter().rev());
        }
        out
    }
}

/// Replace the path separator so names never split a path
pub(crate) fn sanitize_name(name: &str) -> String {
    name.replace(PATH_SEPARATOR, "-")
}
