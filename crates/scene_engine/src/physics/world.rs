//! Physics world wrapper
//!
//! Owns the backend, runs fixed-timestep ticks, tracks which collider pairs are
//! touching and turns pair transitions into listener callbacks.

use super::backend::{
    BodyDesc, BodyHandle, BroadphaseFilter, Motion, PairResponse, PhysicsBackend, SimpleBackend,
};
use super::collision_layers::CollisionLayers;
use super::contact::{ContactInfo, ListenerRef, RayInfo};
use super::culling::CullingType;
use super::error::PhysicsError;
use super::joint::{Joint, JointKey, JointKind};
use super::shape::CollisionShape;
use crate::config::PhysicsConfig;
use crate::foundation::math::{Quat, Vec3};
use crate::scene::{ComponentKey, ComponentRef, ObjectKey, ObjectRef, SceneId};
use crate::spatial::Ray;
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique physics world identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u32);

/// Filtering role of a collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ColliderKind {
    /// Rigid body or phantom
    Body {
        group: u32,
        mask: u32,
        responds: bool,
    },
    /// Visibility ghost
    Culling(CullingType),
}

impl ColliderKind {
    fn pair_response(self, other: Self) -> PairResponse {
        match (self, other) {
            (Self::Culling(a), Self::Culling(b)) => a.pair_response(b),
            (Self::Culling(_), Self::Body { .. }) | (Self::Body { .. }, Self::Culling(_)) => PairResponse::Ignore,
            (
                Self::Body { group: group_a, mask: mask_a, responds: responds_a },
                Self::Body { group: group_b, mask: mask_b, responds: responds_b },
            ) => {
                if !CollisionLayers::should_collide(group_a, mask_a, group_b, mask_b) {
                    PairResponse::Ignore
                } else if responds_a && responds_b {
                    PairResponse::Contact
                } else {
                    PairResponse::OverlapOnly
                }
            }
        }
    }
}

pub(crate) struct ColliderEntry {
    pub(crate) component: ComponentKey,
    pub(crate) owner: ObjectKey,
    pub(crate) kind: ColliderKind,
    pub(crate) motion: Motion,
    cull_radius: f32,
    listeners: Vec<ListenerRef>,
}

type PairKey = (BodyHandle, BodyHandle);

fn pair_key(a: BodyHandle, b: BodyHandle) -> PairKey {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Contact geometry as seen from the first body of the pair
    Begin(ContactInfo),
    End,
}

#[derive(Debug, Clone, Copy)]
struct PairEvent {
    key: PairKey,
    response: PairResponse,
    phase: Phase,
}

struct WorldFilter<'a> {
    colliders: &'a HashMap<BodyHandle, ColliderEntry>,
    joints: &'a SlotMap<JointKey, Joint>,
}

impl BroadphaseFilter for WorldFilter<'_> {
    fn pair_response(&self, a: BodyHandle, b: BodyHandle) -> PairResponse {
        let (Some(entry_a), Some(entry_b)) = (self.colliders.get(&a), self.colliders.get(&b)) else {
            return PairResponse::Ignore;
        };
        let jointed = self
            .joints
            .values()
            .any(|j| !j.collide_connected && j.involves(a) && j.involves(b));
        if jointed {
            return PairResponse::Ignore;
        }
        entry_a.kind.pair_response(entry_b.kind)
    }

    fn accepts_ray(&self, body: BodyHandle) -> bool {
        self.colliders
            .get(&body)
            .is_some_and(|entry| matches!(entry.kind, ColliderKind::Body { .. }))
    }
}

/// Physics simulation owned by a scene
pub struct PhysicsWorld {
    id: WorldId,
    scene: SceneId,
    backend: Box<dyn PhysicsBackend>,
    gravity: Vec3,
    fixed_timestep: f32,
    max_substeps: u32,
    accumulator: f32,
    planar: bool,
    colliders: HashMap<BodyHandle, ColliderEntry>,
    bodies_by_component: HashMap<ComponentKey, BodyHandle>,
    joints: SlotMap<JointKey, Joint>,
    active_pairs: BTreeMap<PairKey, PairResponse>,
    ticks: u64,
}

impl PhysicsWorld {
    /// World using the built-in backend
    pub fn new(scene: SceneId, config: &PhysicsConfig) -> Self {
        Self::with_backend(scene, config, Box::new(SimpleBackend::new()))
    }

    /// World driving a caller-supplied backend
    pub fn with_backend(scene: SceneId, config: &PhysicsConfig, mut backend: Box<dyn PhysicsBackend>) -> Self {
        let gravity = Vec3::from(config.gravity);
        backend.set_gravity(gravity);
        let id = WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed));
        log::debug!("Created physics world {:?} (gravity {:?}, {} Hz)", id, config.gravity, config.update_frequency);

        Self {
            id,
            scene,
            backend,
            gravity,
            fixed_timestep: config.fixed_timestep(),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
            planar: config.planar,
            colliders: HashMap::new(),
            bodies_by_component: HashMap::new(),
            joints: SlotMap::with_key(),
            active_pairs: BTreeMap::new(),
            ticks: 0,
        }
    }

    /// World identifier
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// World gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change world gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        self.backend.set_gravity(gravity);
    }

    /// Length of one tick in seconds
    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of registered colliders, culling ghosts included
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Number of live joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub(crate) fn backend(&self) -> &dyn PhysicsBackend {
        self.backend.as_ref()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.backend.as_mut()
    }

    /// Add frame time to the accumulator and return how many ticks are due.
    ///
    /// At most `max_substeps` ticks are returned; time beyond that is dropped.
    pub fn consume_ticks(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut ticks = 0;
        while self.accumulator >= self.fixed_timestep && ticks < self.max_substeps {
            self.accumulator -= self.fixed_timestep;
            ticks += 1;
        }
        if self.accumulator >= self.fixed_timestep {
            log::warn!(
                "Physics is falling behind, dropping {:.3}s of simulation time",
                self.accumulator
            );
            self.accumulator %= self.fixed_timestep;
        }
        ticks
    }

    /// Run however many fixed ticks `frame_dt` covers; returns the tick count
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let ticks = self.consume_ticks(frame_dt);
        for _ in 0..ticks {
            self.step(self.fixed_timestep);
        }
        ticks
    }

    /// Advance the simulation by exactly one tick of `dt` seconds and dispatch contact callbacks
    pub fn step(&mut self, dt: f32) {
        let filter = WorldFilter {
            colliders: &self.colliders,
            joints: &self.joints,
        };
        self.backend.step(dt, &filter);
        self.ticks += 1;

        let events = self.collect_pair_events();
        self.dispatch(&events);
    }

    fn collect_pair_events(&mut self) -> Vec<PairEvent> {
        let mut current: BTreeMap<PairKey, (PairResponse, ContactInfo)> = BTreeMap::new();
        for manifold in self.backend.contacts() {
            let key = pair_key(manifold.a, manifold.b);
            let normal = if key.0 == manifold.a { manifold.normal } else { -manifold.normal };
            current.entry(key).or_insert((
                manifold.response,
                ContactInfo {
                    point: manifold.point,
                    normal,
                    depth: manifold.depth,
                },
            ));
        }

        let mut events = Vec::new();
        for (key, (response, info)) in &current {
            if !self.active_pairs.contains_key(key) {
                events.push(PairEvent { key: *key, response: *response, phase: Phase::Begin(*info) });
            }
        }
        for (key, response) in &self.active_pairs {
            if !current.contains_key(key) {
                events.push(PairEvent { key: *key, response: *response, phase: Phase::End });
            }
        }

        self.active_pairs = current.into_iter().map(|(key, (response, _))| (key, response)).collect();
        events
    }

    fn dispatch(&mut self, events: &[PairEvent]) {
        for event in events {
            let (a, b) = event.key;
            let (Some(component_a), Some(component_b)) = (
                self.colliders.get(&a).map(|e| e.component),
                self.colliders.get(&b).map(|e| e.component),
            ) else {
                continue;
            };
            let ref_a = ComponentRef::new(self.scene, component_a);
            let ref_b = ComponentRef::new(self.scene, component_b);

            if event.response == PairResponse::Contact {
                match event.phase {
                    Phase::Begin(_) => log::debug!("Contact begin {:?} <-> {:?}", component_a, component_b),
                    Phase::End => log::debug!("Contact end {:?} <-> {:?}", component_a, component_b),
                }
            }

            self.notify(a, ref_a, ref_b, event, false);
            self.notify(b, ref_b, ref_a, event, true);
        }

        for entry in self.colliders.values_mut() {
            entry.listeners.retain(|listener| !listener.expired());
        }
    }

    fn notify(&self, body: BodyHandle, this: ComponentRef, other: ComponentRef, event: &PairEvent, flip: bool) {
        let Some(entry) = self.colliders.get(&body) else { return };
        for listener in &entry.listeners {
            let delivered = listener.with_mut(|l| match (event.response, event.phase) {
                (PairResponse::Contact, Phase::Begin(info)) => {
                    let info = if flip { ContactInfo { normal: -info.normal, ..info } } else { info };
                    l.begin_contact(this, other, &info);
                }
                (PairResponse::Contact, Phase::End) => l.end_contact(this, other),
                (_, Phase::Begin(_)) => l.begin_overlap(this, other),
                (_, Phase::End) => l.end_overlap(this, other),
            });
            if delivered.is_err() {
                log::trace!("Skipping expired contact listener on {:?}", this);
            }
        }
    }

    pub(crate) fn create_collider(
        &mut self,
        component: ComponentKey,
        owner: ObjectKey,
        kind: ColliderKind,
        desc: &BodyDesc,
    ) -> Result<BodyHandle, PhysicsError> {
        if desc.shape.is_infinite() && desc.motion != Motion::Static {
            return Err(PhysicsError::InfiniteShapeNotStatic);
        }

        let handle = self.backend.create_body(desc);
        if self.planar && desc.motion == Motion::Dynamic {
            self.backend.set_linear_factor(handle, Vec3::new(1.0, 1.0, 0.0));
            self.backend.set_angular_factor(handle, Vec3::new(0.0, 0.0, 1.0));
        }

        self.colliders.insert(
            handle,
            ColliderEntry {
                component,
                owner,
                kind,
                motion: desc.motion,
                cull_radius: desc.shape.bounding_radius(),
                listeners: Vec::new(),
            },
        );
        self.bodies_by_component.insert(component, handle);
        log::debug!("Bound collider {:?} ({:?}, {:?})", component, kind, desc.motion);
        Ok(handle)
    }

    /// Tear down the collider of `component`: joints first, then synthesized
    /// end callbacks for every pair still touching, then the backend body.
    pub(crate) fn destroy_collider(&mut self, component: ComponentKey) -> bool {
        let Some(handle) = self.bodies_by_component.remove(&component) else {
            return false;
        };

        let attached: Vec<JointKey> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.involves(handle))
            .map(|(key, _)| key)
            .collect();
        for key in attached {
            self.remove_joint(key);
        }

        let ended: Vec<PairEvent> = self
            .active_pairs
            .iter()
            .filter(|(key, _)| key.0 == handle || key.1 == handle)
            .map(|(key, response)| PairEvent { key: *key, response: *response, phase: Phase::End })
            .collect();
        self.active_pairs.retain(|key, _| key.0 != handle && key.1 != handle);
        self.dispatch(&ended);

        self.colliders.remove(&handle);
        self.backend.destroy_body(handle);
        log::debug!("Unbound collider {:?}", component);
        true
    }

    pub(crate) fn body_of(&self, component: ComponentKey) -> Option<BodyHandle> {
        self.bodies_by_component.get(&component).copied()
    }

    pub(crate) fn colliders(&self) -> impl Iterator<Item = (BodyHandle, &ColliderEntry)> {
        self.colliders.iter().map(|(handle, entry)| (*handle, entry))
    }

    pub(crate) fn set_body_transform(&mut self, body: BodyHandle, position: Vec3, rotation: Quat) {
        self.backend.set_transform(body, position, rotation);
    }

    pub(crate) fn set_cull_radius(&mut self, body: BodyHandle, radius: f32) {
        let Some(entry) = self.colliders.get_mut(&body) else { return };
        if (entry.cull_radius - radius).abs() > f32::EPSILON && radius > 0.0 {
            entry.cull_radius = radius;
            self.backend.set_shape(body, std::sync::Arc::new(CollisionShape::Sphere { radius }));
        }
    }

    /// Register a listener on a collider
    pub(crate) fn add_listener(&mut self, component: ComponentKey, listener: ListenerRef) -> Result<(), PhysicsError> {
        let handle = self.body_of(component).ok_or(PhysicsError::UnknownCollider)?;
        let entry = self.colliders.get_mut(&handle).ok_or(PhysicsError::UnknownCollider)?;
        if !entry.listeners.iter().any(|l| l.ptr_eq(&listener)) {
            entry.listeners.push(listener);
        }
        Ok(())
    }

    /// Unregister a listener; returns whether it was registered
    pub(crate) fn remove_listener(&mut self, component: ComponentKey, listener: &ListenerRef) -> bool {
        let Some(entry) = self.body_of(component).and_then(|h| self.colliders.get_mut(&h)) else {
            return false;
        };
        let before = entry.listeners.len();
        entry.listeners.retain(|l| !l.ptr_eq(listener));
        entry.listeners.len() != before
    }

    pub(crate) fn create_joint(
        &mut self,
        a: ComponentKey,
        b: ComponentKey,
        kind: JointKind,
        collide_connected: bool,
    ) -> Result<JointKey, PhysicsError> {
        if a == b {
            return Err(PhysicsError::SelfJoint);
        }
        let body_a = self.body_of(a).ok_or(PhysicsError::WorldMismatch)?;
        let body_b = self.body_of(b).ok_or(PhysicsError::WorldMismatch)?;
        let constraint = self
            .backend
            .add_constraint(body_a, body_b, kind.desc())
            .ok_or(PhysicsError::ConstraintRejected)?;

        let key = self.joints.insert(Joint {
            kind,
            body_a,
            body_b,
            component_a: a,
            component_b: b,
            constraint,
            collide_connected,
        });
        log::debug!("Created {:?} joint {:?} between {:?} and {:?}", kind, key, a, b);
        Ok(key)
    }

    pub(crate) fn remove_joint(&mut self, key: JointKey) -> bool {
        let Some(joint) = self.joints.remove(key) else {
            return false;
        };
        self.backend.remove_constraint(joint.constraint);
        log::debug!("Removed joint {:?}", key);
        true
    }

    pub(crate) fn joint(&self, key: JointKey) -> Option<&Joint> {
        self.joints.get(key)
    }

    /// Midpoint between the two bodies of a joint
    pub(crate) fn joint_center(&self, key: JointKey) -> Option<Vec3> {
        let joint = self.joints.get(key)?;
        let (a, _) = self.backend.transform(joint.body_a)?;
        let (b, _) = self.backend.transform(joint.body_b)?;
        Some((a + b) * 0.5)
    }

    pub(crate) fn joint_components(&self, key: JointKey) -> Option<(ComponentKey, ComponentKey)> {
        self.joints.get(key).map(|j| (j.component_a, j.component_b))
    }

    /// Nearest physical collider hit by a ray
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayInfo> {
        direction.try_normalize(f32::EPSILON)?;
        let filter = WorldFilter {
            colliders: &self.colliders,
            joints: &self.joints,
        };
        let hit = self.backend.raycast(&Ray::new(origin, direction), max_distance, &filter)?;
        let entry = self.colliders.get(&hit.body)?;
        Some(RayInfo {
            collider: ComponentRef::new(self.scene, entry.component),
            object: ObjectRef::new(self.scene, entry.owner),
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        })
    }

    /// Physical colliders overlapping `shape` at the given placement
    pub fn query_overlaps(&self, shape: &CollisionShape, position: Vec3, rotation: Quat) -> Vec<ComponentRef> {
        self.backend
            .query_overlaps(shape, position, rotation)
            .into_iter()
            .filter_map(|handle| self.colliders.get(&handle))
            .filter(|entry| matches!(entry.kind, ColliderKind::Body { .. }))
            .map(|entry| ComponentRef::new(self.scene, entry.component))
            .collect()
    }

    /// Whether two colliders are currently touching or overlapping
    pub fn in_contact(&self, a: ComponentRef, b: ComponentRef) -> bool {
        match (self.body_of(a.key), self.body_of(b.key)) {
            (Some(a), Some(b)) => self.active_pairs.contains_key(&pair_key(a, b)),
            _ => false,
        }
    }

    /// Number of pairs currently touching or overlapping
    pub fn active_pair_count(&self) -> usize {
        self.active_pairs.len()
    }

    /// `(viewer, drawable)` pairs whose culling colliders overlap right now.
    ///
    /// Computed from current body placements, so it is valid before the first
    /// tick of a frame as well.
    pub(crate) fn culling_overlaps(&self, viewer: CullingType) -> HashSet<(ComponentKey, ComponentKey)> {
        let filter = WorldFilter {
            colliders: &self.colliders,
            joints: &self.joints,
        };
        let mut visible = HashSet::new();
        for (handle, entry) in &self.colliders {
            if entry.kind != ColliderKind::Culling(viewer) {
                continue;
            }
            let Some((position, rotation)) = self.backend.transform(*handle) else { continue };
            let volume = CollisionShape::Sphere { radius: entry.cull_radius };
            for other in self.backend.query_overlaps(&volume, position, rotation) {
                if other == *handle || filter.pair_response(*handle, other) != PairResponse::OverlapOnly {
                    continue;
                }
                if let Some(target) = self.colliders.get(&other) {
                    if target.kind == ColliderKind::Culling(CullingType::Drawable) {
                        visible.insert((entry.component, target.component));
                    }
                }
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::reference::SafeReferenceable;
    use crate::physics::contact::ContactListener;
    use slotmap::SlotMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    impl ContactListener for Log {
        fn begin_contact(&mut self, _c: ComponentRef, _o: ComponentRef, _info: &ContactInfo) {
            self.events.push("begin_contact".into());
        }
        fn end_contact(&mut self, _c: ComponentRef, _o: ComponentRef) {
            self.events.push("end_contact".into());
        }
        fn begin_overlap(&mut self, _c: ComponentRef, _o: ComponentRef) {
            self.events.push("begin_overlap".into());
        }
        fn end_overlap(&mut self, _c: ComponentRef, _o: ComponentRef) {
            self.events.push("end_overlap".into());
        }
    }

    struct Fixture {
        world: PhysicsWorld,
        components: SlotMap<ComponentKey, ()>,
        owner: ObjectKey,
    }

    impl Fixture {
        fn new() -> Self {
            let config = PhysicsConfig { gravity: [0.0, 0.0, 0.0], ..PhysicsConfig::default() };
            let mut objects: SlotMap<ObjectKey, ()> = SlotMap::with_key();
            Self {
                world: PhysicsWorld::new(SceneId::next(), &config),
                components: SlotMap::with_key(),
                owner: objects.insert(()),
            }
        }

        fn ball(&mut self, x: f32, motion: Motion, kind: ColliderKind) -> ComponentKey {
            let key = self.components.insert(());
            let desc = BodyDesc {
                shape: Arc::new(CollisionShape::sphere(0.5).unwrap()),
                motion,
                mass: 1.0,
                position: Vec3::new(x, 0.0, 0.0),
                rotation: Quat::identity(),
                friction: 0.5,
                restitution: 0.0,
                contact_response: matches!(kind, ColliderKind::Body { responds: true, .. }),
            };
            self.world.create_collider(key, self.owner, kind, &desc).unwrap();
            key
        }
    }

    const SOLID: ColliderKind = ColliderKind::Body { group: 1, mask: 1, responds: true };
    const SENSOR: ColliderKind = ColliderKind::Body { group: 1, mask: 1, responds: false };

    #[test]
    fn test_destroying_touching_collider_synthesizes_end() {
        let mut fx = Fixture::new();
        let a = fx.ball(0.0, Motion::Kinematic, SOLID);
        let b = fx.ball(0.8, Motion::Kinematic, SOLID);
        let listener = SafeReferenceable::new(Log::default());
        fx.world.add_listener(a, listener.listener()).unwrap();
        fx.world.add_listener(b, listener.listener()).unwrap();

        fx.world.step(0.02);
        assert!(fx.world.in_contact(ComponentRef::new(fx.world.scene, a), ComponentRef::new(fx.world.scene, b)));

        assert!(fx.world.destroy_collider(b));

        // One callback per side for each transition
        assert_eq!(
            listener.get().events,
            vec!["begin_contact", "begin_contact", "end_contact", "end_contact"]
        );
        assert_eq!(fx.world.active_pair_count(), 0);
    }

    #[test]
    fn test_sensor_pairs_report_overlap() {
        let mut fx = Fixture::new();
        let sensor = fx.ball(0.0, Motion::Kinematic, SENSOR);
        fx.ball(0.8, Motion::Kinematic, SOLID);
        let listener = SafeReferenceable::new(Log::default());
        fx.world.add_listener(sensor, listener.listener()).unwrap();

        fx.world.step(0.02);

        assert_eq!(listener.get().events, vec!["begin_overlap"]);
    }

    #[test]
    fn test_expired_listener_is_pruned() {
        let mut fx = Fixture::new();
        let a = fx.ball(0.0, Motion::Kinematic, SOLID);
        fx.ball(0.8, Motion::Kinematic, SOLID);
        let listener = SafeReferenceable::new(Log::default());
        let weak = listener.listener();
        fx.world.add_listener(a, weak.clone()).unwrap();
        drop(listener);

        fx.world.step(0.02);

        assert!(weak.expired());
        assert!(!fx.world.remove_listener(a, &weak));
    }

    #[test]
    fn test_culling_ghosts_never_touch_bodies() {
        let mut fx = Fixture::new();
        fx.ball(0.0, Motion::Kinematic, ColliderKind::Culling(CullingType::Drawable));
        fx.ball(0.1, Motion::Kinematic, SOLID);

        fx.world.step(0.02);

        assert_eq!(fx.world.active_pair_count(), 0);
        assert!(fx.world.raycast(Vec3::new(-5.0, 0.0, 0.0), Vec3::x(), 100.0).is_some());
    }

    #[test]
    fn test_tick_accumulator_caps_substeps() {
        let mut fx = Fixture::new();

        assert_eq!(fx.world.consume_ticks(0.01), 0);
        assert_eq!(fx.world.consume_ticks(0.01), 1);
        assert_eq!(fx.world.consume_ticks(10.0), 10);
        assert_eq!(fx.world.consume_ticks(0.0), 0);
    }

    #[test]
    fn test_joint_with_foreign_body_is_rejected() {
        let mut fx = Fixture::new();
        let a = fx.ball(0.0, Motion::Dynamic, SOLID);
        let stranger = fx.components.insert(());

        assert_eq!(
            fx.world.create_joint(a, stranger, JointKind::Weld, false).unwrap_err(),
            PhysicsError::WorldMismatch
        );
        assert_eq!(fx.world.joint_count(), 0);
    }

    #[test]
    fn test_hinge_and_slider_joints_are_created() {
        let mut fx = Fixture::new();
        let a = fx.ball(0.0, Motion::Dynamic, SOLID);
        let b = fx.ball(2.0, Motion::Dynamic, SOLID);

        fx.world.create_joint(a, b, JointKind::Rotation { axis: Vec3::z() }, false).unwrap();
        fx.world
            .create_joint(a, b, JointKind::Piston { axis: Vec3::x(), min: -1.0, max: 1.0 }, false)
            .unwrap();
        assert_eq!(
            fx.world
                .create_joint(a, b, JointKind::Piston { axis: Vec3::x(), min: 1.0, max: -1.0 }, false)
                .unwrap_err(),
            PhysicsError::ConstraintRejected
        );
        assert_eq!(fx.world.joint_count(), 2);
    }

    #[test]
    fn test_culling_overlaps_follow_the_pair_matrix() {
        let mut fx = Fixture::new();
        let drawable = fx.ball(0.0, Motion::Kinematic, ColliderKind::Culling(CullingType::Drawable));
        fx.ball(0.2, Motion::Kinematic, ColliderKind::Culling(CullingType::Drawable));
        let camera = fx.ball(0.4, Motion::Kinematic, ColliderKind::Culling(CullingType::Camera));
        fx.ball(0.6, Motion::Kinematic, ColliderKind::Culling(CullingType::LightSource));

        let seen_by_camera = fx.world.culling_overlaps(CullingType::Camera);
        assert_eq!(seen_by_camera.len(), 2);
        assert!(seen_by_camera.contains(&(camera, drawable)));

        // Drawable ghosts do not see each other
        assert!(fx.world.culling_overlaps(CullingType::Drawable).is_empty());
    }
}
