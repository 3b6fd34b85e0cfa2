//! Scene: object tree owner, frame driver and gateway to renderer and physics

use super::component::{Behaviour, Component, ComponentKind, ComponentType, Detached, UpdateContext};
use super::error::SceneError;
use super::graph::{sanitize_name, Graph, PATH_SEPARATOR};
use super::handle::{ComponentKey, ComponentRef, ObjectKey, ObjectRef, SceneId};
use super::object::{Object, ObjectFlags, ObjectMut, ObjectState};
use crate::config::{EngineConfig, NamePolicy, SceneConfig};
use crate::foundation::math::{utils, Mat4, Quat, Transform, Vec3, FORWARD};
use crate::foundation::reference::ReferenceError;
use crate::physics::backend::{BodyDesc, BodyHandle, Motion};
use crate::physics::{
    BodyType, ColliderKind, CollisionShape, CullingType, Joint, JointKind, JointRef, ListenerRef, PhantomBody,
    PhantomType, PhysicsBackend, PhysicsError, PhysicsWorld, RayInfo, RigidBody, RigidBodyInfo, RigidBodyMut,
};
use crate::render::{
    Camera, DrawStats, Drawable, EnvironmentRecorder, GraphicsBackend, LightContainer, LightSource, Renderer,
    Visibility,
};
use std::fmt::Write as _;
use std::sync::Arc;

/// Callbacks around the phases of a scene frame
pub trait SceneHooks {
    /// Before the object tree is updated
    fn pre_update(&mut self, _scene: &mut Scene, _dt: f32) {}

    /// After physics results were written back
    fn post_update(&mut self, _scene: &mut Scene, _dt: f32) {}

    /// After every physics tick
    fn fixed_update(&mut self, _scene: &mut Scene, _dt: f32) {}

    /// Before the renderer draws
    fn pre_draw(&mut self, _scene: &Scene) {}

    /// After the renderer drew
    fn post_draw(&mut self, _scene: &Scene) {}
}

/// A scene owns the object tree, its renderer and its physics world.
///
/// Objects and components live in arenas and are addressed with
/// [`ObjectRef`] / [`ComponentRef`] handles, which resolve to an error once
/// the target is destroyed. Removals requested while the tree is being
/// traversed are deferred to the sweep at the start of the next frame.
pub struct Scene {
    id: SceneId,
    name: String,
    config: SceneConfig,
    pub(crate) graph: Graph,
    renderer: Renderer,
    world: PhysicsWorld,
    hooks: Option<Box<dyn SceneHooks>>,
    delta_scale: f32,
    active: bool,
    traversal_depth: u32,
    pending_objects: Vec<ObjectKey>,
    pending_components: Vec<ComponentKey>,
    running_behaviour: Option<ComponentKey>,
    // Copies of the running behaviour, filled in once it returns
    deferred_copies: Vec<ComponentKey>,
    frame: u64,
}

impl Scene {
    /// Create an empty scene with the built-in physics backend
    pub fn new(name: &str, config: &EngineConfig) -> Self {
        let id = SceneId::next();
        Self::assemble(id, name, config, PhysicsWorld::new(id, &config.physics))
    }

    /// Create an empty scene simulated by `backend`
    pub fn with_physics_backend(name: &str, config: &EngineConfig, backend: Box<dyn PhysicsBackend>) -> Self {
        let id = SceneId::next();
        Self::assemble(id, name, config, PhysicsWorld::with_backend(id, &config.physics, backend))
    }

    fn assemble(id: SceneId, name: &str, config: &EngineConfig, world: PhysicsWorld) -> Self {
        log::info!("Creating scene '{}' ({:?})", name, id);
        Self {
            id,
            name: name.to_string(),
            config: config.scene.clone(),
            graph: Graph::new(),
            renderer: Renderer::new(id, &config.render),
            world,
            hooks: None,
            delta_scale: config.scene.delta_scale,
            active: true,
            traversal_depth: 0,
            pending_objects: Vec::new(),
            pending_components: Vec::new(),
            running_behaviour: None,
            deferred_copies: Vec::new(),
            frame: 0,
        }
    }

    /// Identifier stamped into every handle of this scene
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames updated so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Implicit root; parent of every top level object
    pub fn root(&self) -> ObjectRef {
        ObjectRef::new(self.id, self.graph.root)
    }

    /// Whether `update` and `draw` do anything
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pause or resume the whole scene
    pub fn set_scene_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Multiplier applied to frame time
    pub fn delta_scale(&self) -> f32 {
        self.delta_scale
    }

    /// Multiplier applied to every frame's delta time
    pub fn set_delta_scale(&mut self, scale: f32) {
        self.delta_scale = scale.max(0.0);
    }

    /// Install frame phase callbacks, replacing earlier ones
    pub fn set_hooks(&mut self, hooks: Box<dyn SceneHooks>) {
        self.hooks = Some(hooks);
    }

    /// Renderer holding the bound drawables, cameras, lights and recorders
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Mutable renderer, for masks and light limits
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Physics world simulating this scene's bodies
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Mutable physics world
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    fn resolve(&self, object: ObjectRef) -> Result<ObjectKey, SceneError> {
        if object.scene != self.id {
            return Err(ReferenceError::WrongScene("object").into());
        }
        if self.graph.objects.contains_key(object.key) {
            Ok(object.key)
        } else {
            Err(ReferenceError::Expired("object").into())
        }
    }

    fn resolve_component(&self, component: ComponentRef) -> Result<ComponentKey, SceneError> {
        if component.scene != self.id {
            return Err(ReferenceError::WrongScene("component").into());
        }
        if self.graph.components.contains_key(component.key) {
            Ok(component.key)
        } else {
            Err(ReferenceError::Expired("component").into())
        }
    }

    fn object_ref(&self, key: ObjectKey) -> ObjectRef {
        ObjectRef::new(self.id, key)
    }

    fn component_ref(&self, key: ComponentKey) -> ComponentRef {
        ComponentRef::new(self.id, key)
    }

    // ---------------------------------------------------------------------
    // Objects

    /// Read access to an object
    pub fn object(&self, object: ObjectRef) -> Result<&Object, SceneError> {
        let key = self.resolve(object)?;
        Ok(&self.graph.objects[key])
    }

    /// Chaining editor for an object's local state
    pub fn object_mut(&mut self, object: ObjectRef) -> Result<ObjectMut<'_>, SceneError> {
        let key = self.resolve(object)?;
        Ok(ObjectMut { graph: &mut self.graph, scene: self.id, key })
    }

    /// Lifecycle state; `Destroyed` once the handle no longer resolves
    pub fn state(&self, object: ObjectRef) -> ObjectState {
        self.object(object).map_or(ObjectState::Destroyed, Object::state)
    }

    /// Whether the handle still resolves
    pub fn is_alive(&self, object: ObjectRef) -> bool {
        self.resolve(object).is_ok()
    }

    fn unique_name(&self, parent: ObjectKey, name: String) -> Result<String, SceneError> {
        if self.graph.find_child(parent, &name).is_none() {
            return Ok(name);
        }
        match self.config.name_policy {
            NamePolicy::Reject => Err(SceneError::DuplicateName(name)),
            NamePolicy::AutoSuffix => {
                let free = (1..)
                    .map(|i| format!("{}_{}", name, i))
                    .find(|candidate| self.graph.find_child(parent, candidate).is_none());
                free.ok_or(SceneError::DuplicateName(name))
            }
        }
    }

    fn insert_object(&mut self, parent: ObjectKey, name: String, flags: ObjectFlags) -> ObjectKey {
        let key = self.graph.objects.insert(Object::new(name, Some(parent), flags));
        self.graph.objects[parent].children.push(key);
        key
    }

    /// Create a child object. It starts with an identity transform and the
    /// parent's activity.
    pub fn create_child(&mut self, parent: ObjectRef, name: &str) -> Result<ObjectRef, SceneError> {
        let parent_key = self.resolve(parent)?;
        let parent_flags = self.graph.objects[parent_key].flags;
        if parent_flags.contains(ObjectFlags::PENDING_REMOVAL) {
            return Err(SceneError::PendingRemoval);
        }
        let name = self.unique_name(parent_key, sanitize_name(name))?;
        log::trace!("Creating object '{}'", name);
        let key = self.insert_object(parent_key, name, parent_flags & ObjectFlags::ACTIVE);
        Ok(self.object_ref(key))
    }

    /// Create a top level object
    pub fn create_object(&mut self, name: &str) -> Result<ObjectRef, SceneError> {
        self.create_child(self.root(), name)
    }

    /// Destroy an object and its subtree. Deferred to the next sweep while
    /// the tree is being traversed.
    pub fn remove_object(&mut self, object: ObjectRef) -> Result<(), SceneError> {
        let key = self.resolve(object)?;
        if key == self.graph.root {
            return Err(SceneError::RootObject);
        }
        if self.traversal_depth > 0 {
            for k in self.graph.subtree(key) {
                self.graph.objects[k].flags.insert(ObjectFlags::PENDING_REMOVAL);
            }
            self.pending_objects.push(key);
        } else {
            self.destroy_object(key);
        }
        Ok(())
    }

    /// Remove the direct children of `parent` named `name`
    pub fn remove_children(&mut self, parent: ObjectRef, name: &str) -> Result<usize, SceneError> {
        let parent_key = self.resolve(parent)?;
        let targets: Vec<ObjectKey> = self.graph.objects[parent_key]
            .children
            .iter()
            .copied()
            .filter(|c| {
                self.graph.objects.get(*c).is_some_and(|o| {
                    o.name == name && !o.flags.contains(ObjectFlags::PENDING_REMOVAL)
                })
            })
            .collect();
        for key in &targets {
            self.remove_object(self.object_ref(*key))?;
        }
        Ok(targets.len())
    }

    fn destroy_object(&mut self, key: ObjectKey) {
        let Some(object) = self.graph.objects.get(key) else { return };
        let children = object.children.clone();
        let components = object.components.clone();
        let parent = object.parent;

        for child in children {
            self.destroy_object(child);
        }
        for component in components {
            self.destroy_component(component);
        }
        if let Some(parent) = parent.and_then(|p| self.graph.objects.get_mut(p)) {
            parent.children.retain(|c| *c != key);
        }
        if let Some(object) = self.graph.objects.remove(key) {
            log::trace!("Destroyed object '{}'", object.name);
        }
    }

    /// Activate or deactivate an object and its subtree
    pub fn set_active(&mut self, object: ObjectRef, active: bool) -> Result<(), SceneError> {
        let key = self.resolve(object)?;
        for k in self.graph.subtree(key) {
            self.graph.objects[k].flags.set(ObjectFlags::ACTIVE, active);
        }
        Ok(())
    }

    /// Detach the world transform from the parent chain
    pub fn set_ignore_parent(&mut self, object: ObjectRef, ignore: bool) -> Result<(), SceneError> {
        let key = self.resolve(object)?;
        self.graph.objects[key].flags.set(ObjectFlags::IGNORE_PARENT, ignore);
        self.graph.objects[key].mark_dirty();
        for child in self.graph.objects[key].children.clone() {
            self.graph.invalidate(child);
        }
        Ok(())
    }

    /// Move `child` under `new_parent`, keeping its local transform. Takes a
    /// free name under the new parent and inherits its activity.
    pub fn reparent(&mut self, child: ObjectRef, new_parent: ObjectRef) -> Result<(), SceneError> {
        let child_key = self.resolve(child)?;
        let parent_key = self.resolve(new_parent)?;
        if child_key == self.graph.root {
            return Err(SceneError::RootObject);
        }
        if self.graph.is_self_or_ancestor(child_key, parent_key) {
            return Err(SceneError::WouldCreateCycle);
        }
        // A pending object must stay under the subtree queued for the sweep
        let pending = |k: ObjectKey| self.graph.objects[k].flags.contains(ObjectFlags::PENDING_REMOVAL);
        if pending(child_key) || pending(parent_key) {
            return Err(SceneError::PendingRemoval);
        }
        let old_parent = self.graph.objects[child_key].parent;
        if old_parent == Some(parent_key) {
            return Ok(());
        }

        let name = self.graph.objects[child_key].name.clone();
        let name = self.unique_name(parent_key, name)?;
        if let Some(old) = old_parent.and_then(|p| self.graph.objects.get_mut(p)) {
            old.children.retain(|c| *c != child_key);
        }
        self.graph.objects[parent_key].children.push(child_key);
        let parent_active = self.graph.objects[parent_key].is_active();
        let object = &mut self.graph.objects[child_key];
        object.parent = Some(parent_key);
        object.name = name;
        self.graph.invalidate(child_key);
        if !parent_active {
            self.set_active(child, false)?;
        }
        Ok(())
    }

    /// Deep copy of `source` and its subtree, created as a sibling.
    ///
    /// Components are copied onto the new objects and bound to this scene's
    /// renderer and physics world. Behaviours that cannot be cloned are left
    /// out.
    pub fn clone_object(&mut self, source: ObjectRef, new_name: &str) -> Result<ObjectRef, SceneError> {
        let key = self.resolve(source)?;
        let parent = self.graph.objects[key].parent.ok_or(SceneError::RootObject)?;
        let name = self.unique_name(parent, sanitize_name(new_name))?;
        let copy = self.copy_subtree(key, parent, name)?;
        Ok(self.object_ref(copy))
    }

    fn copy_subtree(&mut self, source: ObjectKey, parent: ObjectKey, name: String) -> Result<ObjectKey, SceneError> {
        let src = &self.graph.objects[source];
        let flags = src.flags & (ObjectFlags::ACTIVE | ObjectFlags::IGNORE_PARENT);
        let local = src.local.clone();
        let tags = src.tags.clone();
        let serialize_info = src.serialize_info.clone();
        let components = src.components.clone();
        let children = src.children.clone();

        let key = self.insert_object(parent, name, flags);
        let object = &mut self.graph.objects[key];
        object.local = local;
        object.tags = tags;
        object.serialize_info = serialize_info;

        for component in components {
            let Some(src) = self.graph.components.get(component) else { continue };
            if src.pending_removal {
                continue;
            }
            let (id, active) = (src.id, src.active);
            let kind = if self.running_behaviour == Some(component) {
                Some(ComponentKind::Behaviour(Box::new(Detached)))
            } else {
                src.kind.duplicate()
            };
            let Some(kind) = kind else {
                log::warn!("Skipping {} component that cannot be cloned", src.component_type().name());
                continue;
            };
            let copy = self.attach_component(key, kind)?;
            if let Some(c) = self.graph.components.get_mut(copy) {
                c.id = id;
                c.active = active;
            }
            if self.running_behaviour == Some(component) {
                self.deferred_copies.push(copy);
            }
        }

        for child in children {
            let Some(object) = self.graph.objects.get(child) else { continue };
            if object.flags.contains(ObjectFlags::PENDING_REMOVAL) {
                continue;
            }
            let name = object.name.clone();
            self.copy_subtree(child, key, name)?;
        }
        Ok(key)
    }

    // ---------------------------------------------------------------------
    // Transforms

    /// World matrix, recomputed if the object or an ancestor changed
    pub fn world_matrix(&self, object: ObjectRef) -> Result<Mat4, SceneError> {
        let key = self.resolve(object)?;
        Ok(self.graph.world_matrix(key))
    }

    /// Inverse of [`Scene::world_matrix`]; identity when singular
    pub fn inverse_world_matrix(&self, object: ObjectRef) -> Result<Mat4, SceneError> {
        Ok(self.world_matrix(object)?.try_inverse().unwrap_or_else(Mat4::identity))
    }

    fn global_transform(&self, object: ObjectRef) -> Result<Transform, SceneError> {
        Ok(Transform::from_matrix(&self.world_matrix(object)?))
    }

    /// World space position
    pub fn global_position(&self, object: ObjectRef) -> Result<Vec3, SceneError> {
        Ok(utils::translation(&self.world_matrix(object)?))
    }

    /// World space rotation
    pub fn global_rotation(&self, object: ObjectRef) -> Result<Quat, SceneError> {
        Ok(self.global_transform(object)?.rotation)
    }

    /// World space scale
    pub fn global_scale(&self, object: ObjectRef) -> Result<Vec3, SceneError> {
        Ok(self.global_transform(object)?.scale)
    }

    /// World space forward direction (local -Z)
    pub fn global_front(&self, object: ObjectRef) -> Result<Vec3, SceneError> {
        Ok(self.global_rotation(object)? * FORWARD)
    }

    /// World space right direction (local +X)
    pub fn global_right(&self, object: ObjectRef) -> Result<Vec3, SceneError> {
        Ok(self.global_rotation(object)? * Vec3::x())
    }

    /// World space up direction (local +Y)
    pub fn global_up(&self, object: ObjectRef) -> Result<Vec3, SceneError> {
        Ok(self.global_rotation(object)? * Vec3::y())
    }

    // ---------------------------------------------------------------------
    // Tree queries

    /// Parent object; `None` for the root
    pub fn parent(&self, object: ObjectRef) -> Result<Option<ObjectRef>, SceneError> {
        let key = self.resolve(object)?;
        Ok(self.graph.objects[key].parent.map(|p| self.object_ref(p)))
    }

    /// Direct children, including those pending removal
    pub fn children(&self, object: ObjectRef) -> Result<Vec<ObjectRef>, SceneError> {
        let key = self.resolve(object)?;
        Ok(self.graph.objects[key].children.iter().map(|c| self.object_ref(*c)).collect())
    }

    /// Number of descendants
    pub fn child_count_recursive(&self, object: ObjectRef) -> Result<usize, SceneError> {
        let key = self.resolve(object)?;
        Ok(self.graph.subtree(key).len() - 1)
    }

    fn descendants_matching(&self, parent: ObjectKey, recursive: bool, pred: impl Fn(&Object) -> bool) -> Vec<ObjectRef> {
        let candidates: Vec<ObjectKey> = if recursive {
            self.graph.subtree(parent).into_iter().skip(1).collect()
        } else {
            self.graph.objects[parent].children.clone()
        };
        candidates
            .into_iter()
            .filter(|k| {
                self.graph
                    .objects
                    .get(*k)
                    .is_some_and(|o| !o.flags.contains(ObjectFlags::PENDING_REMOVAL) && pred(o))
            })
            .map(|k| self.object_ref(k))
            .collect()
    }

    /// First child named `name`, searching depth first when `recursive`
    pub fn find_child(&self, parent: ObjectRef, name: &str, recursive: bool) -> Option<ObjectRef> {
        let key = self.resolve(parent).ok()?;
        self.descendants_matching(key, recursive, |o| o.name == name).into_iter().next()
    }

    /// Every child named `name`
    pub fn find_children(&self, parent: ObjectRef, name: &str, recursive: bool) -> Vec<ObjectRef> {
        match self.resolve(parent) {
            Ok(key) => self.descendants_matching(key, recursive, |o| o.name == name),
            Err(_) => Vec::new(),
        }
    }

    /// Every child carrying `tag`
    pub fn find_children_with_tag(&self, parent: ObjectRef, tag: &str, recursive: bool) -> Vec<ObjectRef> {
        match self.resolve(parent) {
            Ok(key) => self.descendants_matching(key, recursive, |o| o.has_tag(tag)),
            Err(_) => Vec::new(),
        }
    }

    /// Resolve a `parent>child>grandchild` path from the root
    pub fn find_by_path(&self, path: &str) -> Option<ObjectRef> {
        let mut current = self.graph.root;
        for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current = self.graph.find_child(current, segment)?;
        }
        Some(self.object_ref(current))
    }

    /// Path accepted by [`Scene::find_by_path`] for `object`
    pub fn make_search_path(&self, object: ObjectRef) -> Result<String, SceneError> {
        let mut key = self.resolve(object)?;
        let mut names = Vec::new();
        while let Some(parent) = self.graph.objects[key].parent {
            names.push(self.graph.objects[key].name.as_str());
            key = parent;
        }
        names.reverse();
        Ok(names.join(&PATH_SEPARATOR.to_string()))
    }

    /// Indented listing of the whole tree, also written to the debug log
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.graph.root, 0usize)];
        while let Some((key, depth)) = stack.pop() {
            let Some(object) = self.graph.objects.get(key) else { continue };
            let _ = writeln!(
                out,
                "{:indent$}{} [{:?}, {} components]",
                "",
                object.name,
                object.state(),
                object.components.len(),
                indent = depth * 2
            );
            stack.extend(object.children.iter().rev().map(|c| (*c, depth + 1)));
        }
        for line in out.lines() {
            log::debug!("{}", line);
        }
        out
    }

    // ---------------------------------------------------------------------
    // Components

    /// Attach a component, binding it to the renderer and physics world
    pub fn create_component(&mut self, object: ObjectRef, kind: ComponentKind) -> Result<ComponentRef, SceneError> {
        let owner = self.resolve(object)?;
        if self.graph.objects[owner].flags.contains(ObjectFlags::PENDING_REMOVAL) {
            return Err(SceneError::PendingRemoval);
        }
        let key = self.attach_component(owner, kind)?;
        Ok(self.component_ref(key))
    }

    /// Attach a drawable and bind it to the renderer
    pub fn create_drawable(&mut self, object: ObjectRef, drawable: Drawable) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::Drawable(drawable))
    }

    /// Attach a camera and bind it to the renderer
    pub fn create_camera(&mut self, object: ObjectRef, camera: Camera) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::Camera(camera))
    }

    /// Attach a light and bind it to the renderer
    pub fn create_light(&mut self, object: ObjectRef, light: LightSource) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::Light(light))
    }

    /// Attach an environment recorder and bind it to the renderer
    pub fn create_environment_recorder(
        &mut self,
        object: ObjectRef,
        recorder: EnvironmentRecorder,
    ) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::EnvironmentRecorder(recorder))
    }

    /// Attach a simulated body placed at the object's world transform.
    /// Dynamic bodies detach the object from its parent transform.
    pub fn create_rigid_body(&mut self, object: ObjectRef, info: RigidBodyInfo) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::RigidBody(RigidBody::new(info)))
    }

    /// Attach an overlap-only phantom. At most one body per object.
    pub fn create_phantom_body(&mut self, object: ObjectRef, phantom: PhantomBody) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::Phantom(phantom))
    }

    /// Attach user logic
    pub fn add_behaviour(&mut self, object: ObjectRef, behaviour: impl Behaviour + 'static) -> Result<ComponentRef, SceneError> {
        self.create_component(object, ComponentKind::Behaviour(Box::new(behaviour)))
    }

    fn attach_component(&mut self, owner: ObjectKey, kind: ComponentKind) -> Result<ComponentKey, SceneError> {
        let is_body = matches!(kind, ComponentKind::RigidBody(_) | ComponentKind::Phantom(_));
        if is_body && self.has_body(owner) {
            return Err(SceneError::BodyAlreadyAttached);
        }

        let key = self.graph.components.insert(Component::new(owner, kind));
        if let Err(err) = self.register(key) {
            log::warn!("Component registration failed: {}", err);
            self.graph.components.remove(key);
            return Err(err);
        }
        self.graph.objects[owner].components.push(key);
        Ok(key)
    }

    fn has_body(&self, owner: ObjectKey) -> bool {
        self.graph.objects[owner].components.iter().any(|c| {
            self.graph
                .components
                .get(*c)
                .is_some_and(|c| matches!(c.kind, ComponentKind::RigidBody(_) | ComponentKind::Phantom(_)))
        })
    }

    /// Renderer binding and physics registration for a freshly inserted component
    fn register(&mut self, key: ComponentKey) -> Result<(), SceneError> {
        let component = &self.graph.components[key];
        let owner = component.owner;
        let world = self.graph.world_matrix(owner);
        let placement = Transform::from_matrix(&world);

        match &component.kind {
            ComponentKind::RigidBody(body) => {
                let info = body.info();
                let sensor = info.body_type.is_sensor();
                let desc = BodyDesc {
                    shape: Arc::clone(&info.shape),
                    motion: info.body_type.motion(),
                    mass: body.mass(),
                    position: placement.position,
                    rotation: placement.rotation,
                    friction: info.friction,
                    restitution: info.restitution,
                    contact_response: !sensor,
                };
                let kind = ColliderKind::Body { group: info.group, mask: info.mask, responds: !sensor };
                let dynamic = info.body_type.is_dynamic();
                let handle = self.world.create_collider(key, owner, kind, &desc)?;
                if let Some(ComponentKind::RigidBody(body)) = self.graph.components.get_mut(key).map(|c| &mut c.kind) {
                    body.body = Some(handle);
                }
                if dynamic {
                    let object = &mut self.graph.objects[owner];
                    object.local = placement;
                    object.flags.insert(ObjectFlags::IGNORE_PARENT);
                    self.graph.invalidate(owner);
                }
            }
            ComponentKind::Phantom(phantom) => {
                let desc = BodyDesc {
                    shape: Arc::clone(phantom.shape()),
                    motion: match phantom.phantom_type() {
                        PhantomType::Static => Motion::Static,
                        PhantomType::Kinematic => Motion::Kinematic,
                    },
                    mass: 0.0,
                    position: placement.position,
                    rotation: placement.rotation,
                    friction: 0.0,
                    restitution: 0.0,
                    contact_response: false,
                };
                let kind = ColliderKind::Body { group: phantom.group(), mask: phantom.mask(), responds: false };
                let handle = self.world.create_collider(key, owner, kind, &desc)?;
                if let Some(ComponentKind::Phantom(phantom)) = self.graph.components.get_mut(key).map(|c| &mut c.kind) {
                    phantom.body = Some(handle);
                }
            }
            kind => {
                if let Some(slot) = kind.bind_slot() {
                    if self.renderer.culling_enabled() {
                        self.create_culler(key)?;
                    }
                    self.renderer.bind(slot, key);
                }
            }
        }
        Ok(())
    }

    /// Culling tag, world position and radius of a render component's ghost
    fn culling_volume(&self, key: ComponentKey) -> Option<(CullingType, Vec3, f32)> {
        let component = self.graph.components.get(key)?;
        let world = self.graph.world_matrix(component.owner);
        let position = utils::translation(&world);
        match &component.kind {
            ComponentKind::Drawable(drawable) => {
                let bounds = drawable.world_bounds(&world);
                Some((CullingType::Drawable, bounds.center, bounds.radius))
            }
            ComponentKind::Camera(camera) => Some((CullingType::Camera, position, camera.culling_radius())),
            ComponentKind::Light(light) => Some((CullingType::LightSource, position, light.range())),
            ComponentKind::EnvironmentRecorder(recorder) => {
                Some((CullingType::EnvironmentRecorder, position, recorder.range()))
            }
            _ => None,
        }
    }

    fn create_culler(&mut self, key: ComponentKey) -> Result<BodyHandle, SceneError> {
        let owner = self.graph.components[key].owner;
        let (tag, position, radius) = self.culling_volume(key).ok_or(PhysicsError::UnknownCollider)?;
        let desc = BodyDesc {
            shape: Arc::new(CollisionShape::Sphere { radius: radius.max(f32::EPSILON) }),
            motion: Motion::Kinematic,
            mass: 0.0,
            position,
            rotation: Quat::identity(),
            friction: 0.0,
            restitution: 0.0,
            contact_response: false,
        };
        Ok(self.world.create_collider(key, owner, ColliderKind::Culling(tag), &desc)?)
    }

    /// Remove a component. Deferred to the next sweep while the tree is being
    /// traversed.
    pub fn remove_component(&mut self, component: ComponentRef) -> Result<(), SceneError> {
        let key = self.resolve_component(component)?;
        if self.traversal_depth > 0 {
            self.graph.components[key].pending_removal = true;
            self.pending_components.push(key);
        } else {
            self.destroy_component(key);
        }
        Ok(())
    }

    /// Unbind from the renderer, tear down physics (joints and contacts
    /// first), detach from the owner, free the slot.
    fn destroy_component(&mut self, key: ComponentKey) {
        let Some(component) = self.graph.components.get(key) else { return };
        let owner = component.owner;
        if let Some(slot) = component.kind.bind_slot() {
            self.renderer.unbind(slot, key);
        }
        self.world.destroy_collider(key);
        if let Some(object) = self.graph.objects.get_mut(owner) {
            object.components.retain(|c| *c != key);
        }
        self.graph.components.remove(key);
    }

    /// Read access to a component
    pub fn component(&self, component: ComponentRef) -> Result<&Component, SceneError> {
        let key = self.resolve_component(component)?;
        Ok(&self.graph.components[key])
    }

    /// Whether the component handle still resolves
    pub fn component_alive(&self, component: ComponentRef) -> bool {
        self.resolve_component(component).is_ok()
    }

    /// Object carrying the component
    pub fn component_owner(&self, component: ComponentRef) -> Result<ObjectRef, SceneError> {
        Ok(self.object_ref(self.component(component)?.owner))
    }

    /// Components of an object in attachment order
    pub fn components(&self, object: ObjectRef) -> Result<Vec<ComponentRef>, SceneError> {
        let key = self.resolve(object)?;
        Ok(self.graph.objects[key].components.iter().map(|c| self.component_ref(*c)).collect())
    }

    /// First component of `component_type` on the object
    pub fn find_component(&self, object: ObjectRef, component_type: ComponentType) -> Option<ComponentRef> {
        let key = self.resolve(object).ok()?;
        self.graph.objects[key]
            .components
            .iter()
            .find(|c| self.graph.components.get(**c).is_some_and(|c| c.component_type() == component_type))
            .map(|c| self.component_ref(*c))
    }

    /// Enable or disable a single component
    pub fn set_component_active(&mut self, component: ComponentRef, active: bool) -> Result<(), SceneError> {
        let key = self.resolve_component(component)?;
        self.graph.components[key].active = active;
        Ok(())
    }

    /// Set the user tag of a component
    pub fn set_component_id(&mut self, component: ComponentRef, id: u32) -> Result<(), SceneError> {
        let key = self.resolve_component(component)?;
        self.graph.components[key].id = id;
        Ok(())
    }

    fn kind_mut(&mut self, component: ComponentRef) -> Result<&mut ComponentKind, SceneError> {
        let key = self.resolve_component(component)?;
        Ok(&mut self.graph.components[key].kind)
    }

    /// Mutable drawable payload
    pub fn drawable_mut(&mut self, component: ComponentRef) -> Result<&mut Drawable, SceneError> {
        match self.kind_mut(component)? {
            ComponentKind::Drawable(drawable) => Ok(drawable),
            _ => Err(SceneError::WrongComponentKind(ComponentType::Drawable.name())),
        }
    }

    /// Mutable camera payload
    pub fn camera_mut(&mut self, component: ComponentRef) -> Result<&mut Camera, SceneError> {
        match self.kind_mut(component)? {
            ComponentKind::Camera(camera) => Ok(camera),
            _ => Err(SceneError::WrongComponentKind(ComponentType::Camera.name())),
        }
    }

    /// Mutable light payload
    pub fn light_mut(&mut self, component: ComponentRef) -> Result<&mut LightSource, SceneError> {
        match self.kind_mut(component)? {
            ComponentKind::Light(light) => Ok(light),
            _ => Err(SceneError::WrongComponentKind(ComponentType::Light.name())),
        }
    }

    /// Mutable environment recorder payload
    pub fn environment_recorder_mut(&mut self, component: ComponentRef) -> Result<&mut EnvironmentRecorder, SceneError> {
        match self.kind_mut(component)? {
            ComponentKind::EnvironmentRecorder(recorder) => Ok(recorder),
            _ => Err(SceneError::WrongComponentKind(ComponentType::EnvironmentRecorder.name())),
        }
    }

    // ---------------------------------------------------------------------
    // Rendering

    /// Lights the renderer would hand to `drawable` right now
    pub fn choose_lights(&self, drawable: ComponentRef) -> Result<LightContainer, SceneError> {
        let key = self.resolve_component(drawable)?;
        if self.graph.components[key].as_drawable().is_none() {
            return Err(SceneError::WrongComponentKind(ComponentType::Drawable.name()));
        }
        Ok(self.renderer.choose_lights(&self.graph, key))
    }

    /// Run the draw pass
    pub fn draw(&mut self, backend: &mut dyn GraphicsBackend) -> DrawStats {
        if !self.active {
            return DrawStats::default();
        }
        self.with_hooks(|hooks, scene| hooks.pre_draw(scene));

        let visibility = self.renderer.culling_enabled().then(|| Visibility {
            cameras: self.world.culling_overlaps(CullingType::Camera),
            recorders: self.world.culling_overlaps(CullingType::EnvironmentRecorder),
        });
        let stats = self.renderer.draw(&self.graph, visibility.as_ref(), backend);

        self.with_hooks(|hooks, scene| hooks.post_draw(scene));
        stats
    }

    // ---------------------------------------------------------------------
    // Frame

    fn with_hooks(&mut self, f: impl FnOnce(&mut dyn SceneHooks, &mut Scene)) {
        if let Some(mut hooks) = self.hooks.take() {
            f(hooks.as_mut(), self);
            if self.hooks.is_none() {
                self.hooks = Some(hooks);
            }
        }
    }

    /// Advance the scene by one frame.
    ///
    /// Sweeps pending removals, runs `pre_update`, updates the object tree
    /// (components before children), feeds kinematic transforms to physics,
    /// runs the fixed ticks due this frame and writes dynamic bodies back
    /// before `post_update`.
    pub fn update(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        let dt = dt * self.delta_scale;

        self.sweep();
        self.with_hooks(|hooks, scene| hooks.pre_update(scene, dt));

        self.traversal_depth += 1;
        self.update_object(self.graph.root, dt);
        self.traversal_depth -= 1;

        self.sync_in();
        let ticks = self.world.consume_ticks(dt);
        let fixed = self.world.fixed_timestep();
        for tick in 0..ticks {
            if tick > 0 {
                self.sync_in();
            }
            self.world.step(fixed);
            self.sync_out();
            self.fixed_update_behaviours(fixed);
            self.with_hooks(|hooks, scene| hooks.fixed_update(scene, fixed));
        }

        self.with_hooks(|hooks, scene| hooks.post_update(scene, dt));
        self.frame += 1;
    }

    /// The single cleanup point for deferred removals
    fn sweep(&mut self) {
        for key in std::mem::take(&mut self.pending_components) {
            self.destroy_component(key);
        }
        for key in std::mem::take(&mut self.pending_objects) {
            self.destroy_object(key);
        }
    }

    /// Components first, then children. Lists are walked by index so entries
    /// appended during the walk are visited in the same frame.
    fn update_object(&mut self, key: ObjectKey, dt: f32) {
        let mut index = 0;
        loop {
            if !self.graph.object_live(key) {
                return;
            }
            let Some(&component) = self.graph.objects[key].components.get(index) else { break };
            index += 1;
            self.run_behaviour(component, dt, false);
        }

        let mut index = 0;
        loop {
            if !self.graph.object_live(key) {
                return;
            }
            let Some(&child) = self.graph.objects[key].children.get(index) else { break };
            index += 1;
            if self.graph.object_live(child) {
                self.update_object(child, dt);
            }
        }
    }

    fn fixed_update_behaviours(&mut self, dt: f32) {
        self.traversal_depth += 1;
        for key in self.graph.live_behaviours() {
            self.run_behaviour(key, dt, true);
        }
        self.traversal_depth -= 1;
    }

    fn run_behaviour(&mut self, key: ComponentKey, dt: f32, fixed: bool) {
        if !self.graph.component_live(key) {
            return;
        }
        let Some(component) = self.graph.components.get_mut(key) else { return };
        let owner = component.owner;
        let ComponentKind::Behaviour(slot) = &mut component.kind else { return };
        let mut behaviour = std::mem::replace(slot, Box::new(Detached));

        let (object, this) = (self.object_ref(owner), self.component_ref(key));
        let outer = self.running_behaviour.replace(key);
        let mut ctx = UpdateContext { scene: self, object, component: this };
        if fixed {
            behaviour.fixed_update(&mut ctx, dt);
        } else {
            behaviour.update(&mut ctx, dt);
        }
        self.running_behaviour = outer;

        for copy in std::mem::take(&mut self.deferred_copies) {
            self.fill_behaviour_copy(copy, behaviour.as_ref());
        }
        if let Some(ComponentKind::Behaviour(slot)) = self.graph.components.get_mut(key).map(|c| &mut c.kind) {
            *slot = behaviour;
        }
    }

    /// Replace the placeholder left by cloning an object from inside its own
    /// behaviour with a real copy of that behaviour
    fn fill_behaviour_copy(&mut self, copy: ComponentKey, source: &dyn Behaviour) {
        if !self.graph.components.contains_key(copy) {
            return;
        }
        match source.clone_boxed() {
            Some(behaviour) => {
                if let Some(ComponentKind::Behaviour(slot)) = self.graph.components.get_mut(copy).map(|c| &mut c.kind) {
                    *slot = behaviour;
                }
            }
            None => {
                log::warn!("Skipping {} component that cannot be cloned", source.name());
                self.destroy_component(copy);
            }
        }
    }

    /// Kinematic bodies, kinematic phantoms and culling ghosts follow their
    /// owner. Static bodies stay where they were created.
    fn sync_in(&mut self) {
        let updates: Vec<(BodyHandle, Vec3, Quat, Option<f32>)> = self
            .world
            .colliders()
            .filter_map(|(handle, entry)| match entry.kind {
                ColliderKind::Body { .. } if entry.motion != Motion::Kinematic => None,
                ColliderKind::Body { .. } => {
                    if !self.graph.objects.contains_key(entry.owner) {
                        return None;
                    }
                    let placement = Transform::from_matrix(&self.graph.world_matrix(entry.owner));
                    Some((handle, placement.position, placement.rotation, None))
                }
                ColliderKind::Culling(_) => {
                    let (_, position, radius) = self.culling_volume(entry.component)?;
                    Some((handle, position, Quat::identity(), Some(radius)))
                }
            })
            .collect();

        for (handle, position, rotation, radius) in updates {
            self.world.set_body_transform(handle, position, rotation);
            if let Some(radius) = radius {
                self.world.set_cull_radius(handle, radius);
            }
        }
    }

    /// Dynamic bodies write their transform into the owner's local transform
    fn sync_out(&mut self) {
        let moved: Vec<(ObjectKey, Vec3, Quat)> = self
            .world
            .colliders()
            .filter(|(_, entry)| entry.motion == Motion::Dynamic && matches!(entry.kind, ColliderKind::Body { .. }))
            .filter_map(|(handle, entry)| {
                let (position, rotation) = self.world.backend().transform(handle)?;
                Some((entry.owner, position, rotation))
            })
            .collect();

        for (owner, position, rotation) in moved {
            let Some(object) = self.graph.objects.get_mut(owner) else { continue };
            object.local.position = position;
            object.local.rotation = rotation;
            object.flags.insert(ObjectFlags::IGNORE_PARENT);
            self.graph.invalidate(owner);
        }
    }

    // ---------------------------------------------------------------------
    // Physics

    /// Nearest physical collider along a ray
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayInfo> {
        self.world.raycast(origin, direction, max_distance)
    }

    /// Force, velocity and placement access for a rigid body component
    pub fn rigid_body_mut(&mut self, component: ComponentRef) -> Result<RigidBodyMut<'_>, SceneError> {
        let key = self.resolve_component(component)?;
        let Some(body) = self.graph.components[key].as_rigid_body() else {
            return Err(SceneError::WrongComponentKind(ComponentType::RigidBody.name()));
        };
        let body_type: BodyType = body.body_type();
        let handle = body.body.ok_or(PhysicsError::UnknownCollider)?;
        Ok(RigidBodyMut { world: &mut self.world, body: handle, body_type })
    }

    fn rigid_body_key(&self, component: ComponentRef) -> Result<ComponentKey, SceneError> {
        if component.scene != self.id {
            log::warn!("Joint rejected: body belongs to another world");
            return Err(PhysicsError::WorldMismatch.into());
        }
        let key = self.resolve_component(component)?;
        if self.graph.components[key].as_rigid_body().is_none() {
            return Err(PhysicsError::NotARigidBody.into());
        }
        Ok(key)
    }

    /// Connect two rigid bodies of this scene
    pub fn create_joint(
        &mut self,
        a: ComponentRef,
        b: ComponentRef,
        kind: JointKind,
        collide_connected: bool,
    ) -> Result<JointRef, SceneError> {
        let (a, b) = (self.rigid_body_key(a)?, self.rigid_body_key(b)?);
        match self.world.create_joint(a, b, kind, collide_connected) {
            Ok(key) => Ok(JointRef { scene: self.id, key }),
            Err(err) => {
                log::warn!("Joint creation failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Remove a joint; `false` if it was already gone
    pub fn remove_joint(&mut self, joint: JointRef) -> bool {
        joint.scene == self.id && self.world.remove_joint(joint.key)
    }

    /// Joint data, if the joint is still alive
    pub fn joint(&self, joint: JointRef) -> Option<&Joint> {
        if joint.scene != self.id {
            return None;
        }
        self.world.joint(joint.key)
    }

    /// Midpoint between the two bodies of a joint
    pub fn joint_center(&self, joint: JointRef) -> Option<Vec3> {
        if joint.scene != self.id {
            return None;
        }
        self.world.joint_center(joint.key)
    }

    /// The two rigid body components of a joint
    pub fn joint_bodies(&self, joint: JointRef) -> Option<(ComponentRef, ComponentRef)> {
        if joint.scene != self.id {
            return None;
        }
        let (a, b) = self.world.joint_components(joint.key)?;
        Some((self.component_ref(a), self.component_ref(b)))
    }

    /// Register a contact listener on a rigid or phantom body
    pub fn add_contact_listener(&mut self, collider: ComponentRef, listener: ListenerRef) -> Result<(), SceneError> {
        let key = self.resolve_component(collider)?;
        Ok(self.world.add_listener(key, listener)?)
    }

    /// Unregister a contact listener; `Ok(false)` if it was not registered
    pub fn remove_contact_listener(&mut self, collider: ComponentRef, listener: &ListenerRef) -> Result<bool, SceneError> {
        let key = self.resolve_component(collider)?;
        Ok(self.world.remove_listener(key, listener))
    }
}

impl Drop for Scene {
    /// Tear the tree down so listeners see every contact end
    fn drop(&mut self) {
        let children = self.graph.objects[self.graph.root].children.clone();
        for child in children {
            self.destroy_object(child);
        }
        log::info!("Destroyed scene '{}'", self.name);
    }
}
