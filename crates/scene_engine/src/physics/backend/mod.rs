//! Boundary between the physics world wrapper and a simulation backend.
//!
//! The world only ever talks to a backend through [`PhysicsBackend`]; the
//! built-in [`SimpleBackend`] covers the shapes and constraints the engine
//! ships with, and an external engine can be plugged in behind the same trait.

mod simple;

pub use simple::SimpleBackend;

use super::shape::CollisionShape;
use crate::foundation::math::{Quat, Vec3};
use crate::spatial::Ray;
use slotmap::new_key_type;
use std::sync::Arc;

new_key_type! {
    /// Backend body handle
    pub struct BodyHandle;
    /// Backend constraint handle
    pub struct ConstraintHandle;
}

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Never moves
    Static,
    /// Integrated by the simulation
    Dynamic,
    /// Moved explicitly by its owner; pushes dynamic bodies but is not pushed back
    Kinematic,
}

/// Everything the backend needs to create a body
#[derive(Debug, Clone)]
pub struct BodyDesc {
    /// Collision geometry
    pub shape: Arc<CollisionShape>,
    /// Motion type
    pub motion: Motion,
    /// Mass, ignored unless dynamic
    pub mass: f32,
    /// Initial position
    pub position: Vec3,
    /// Initial rotation
    pub rotation: Quat,
    /// Friction coefficient
    pub friction: f32,
    /// Restitution (bounciness)
    pub restitution: f32,
    /// Whether contacts with this body push things apart
    pub contact_response: bool,
}

/// Verdict of the broadphase filter for one body pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairResponse {
    /// Skip the pair before narrowphase
    Ignore,
    /// Report overlap, no physical response
    OverlapOnly,
    /// Report contact and resolve it
    Contact,
}

/// Callback consulted by the backend before narrowphase
pub trait BroadphaseFilter {
    /// Decide how a pair of bodies interacts
    fn pair_response(&self, a: BodyHandle, b: BodyHandle) -> PairResponse;

    /// Whether raycasts may hit this body
    fn accepts_ray(&self, _body: BodyHandle) -> bool {
        true
    }
}

/// Filter that lets every pair collide
pub struct AcceptAll;

impl BroadphaseFilter for AcceptAll {
    fn pair_response(&self, _a: BodyHandle, _b: BodyHandle) -> PairResponse {
        PairResponse::Contact
    }
}

/// Touching pair reported after a step
#[derive(Debug, Clone, Copy)]
pub struct ContactManifold {
    /// First body
    pub a: BodyHandle,
    /// Second body
    pub b: BodyHandle,
    /// Point of deepest penetration in world space
    pub point: Vec3,
    /// Contact normal, pointing from `a` towards `b`
    pub normal: Vec3,
    /// Penetration depth
    pub depth: f32,
    /// Response the filter assigned to the pair
    pub response: PairResponse,
}

/// Nearest hit reported by a raycast
#[derive(Debug, Clone, Copy)]
pub struct BackendRayHit {
    /// Body that was hit
    pub body: BodyHandle,
    /// Distance along the ray
    pub distance: f32,
    /// Hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

/// Constraint description handed to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintDesc {
    /// Keep the relative offset captured at creation
    Weld,
    /// Keep the bodies no further apart than `max_length`
    Rope {
        /// Maximum distance between the body centers
        max_length: f32,
    },
    /// Keep the relative offset, allow relative spin about `axis` only
    Hinge {
        /// World space axis at creation
        axis: Vec3,
    },
    /// Keep the relative orientation, allow travel along `axis` within
    /// `[min, max]` of the creation offset
    Slider {
        /// World space axis at creation
        axis: Vec3,
        /// Lower travel limit
        min: f32,
        /// Upper travel limit
        max: f32,
    },
}

/// Simulation backend used by the physics world
pub trait PhysicsBackend: Send {
    /// Set world gravity
    fn set_gravity(&mut self, gravity: Vec3);

    /// Create a body and return its handle
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Destroy a body; returns false for an unknown handle
    fn destroy_body(&mut self, body: BodyHandle) -> bool;

    /// Replace the collision shape of a body
    fn set_shape(&mut self, body: BodyHandle, shape: Arc<CollisionShape>);

    /// Teleport a body
    fn set_transform(&mut self, body: BodyHandle, position: Vec3, rotation: Quat);

    /// Current position and rotation of a body
    fn transform(&self, body: BodyHandle) -> Option<(Vec3, Quat)>;

    /// Set linear velocity
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    /// Current linear velocity
    fn linear_velocity(&self, body: BodyHandle) -> Vec3;

    /// Set angular velocity
    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    /// Current angular velocity
    fn angular_velocity(&self, body: BodyHandle) -> Vec3;

    /// Accumulate a force applied at an offset from the center of mass
    fn apply_force(&mut self, body: BodyHandle, force: Vec3, offset: Vec3);

    /// Apply an instantaneous impulse at an offset from the center of mass
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, offset: Vec3);

    /// Accumulate a torque
    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3);

    /// Drop accumulated forces and torques
    fn clear_forces(&mut self, body: BodyHandle);

    /// Per-body gravity override; `None` restores world gravity
    fn set_body_gravity(&mut self, body: BodyHandle, gravity: Option<Vec3>);

    /// Scale linear motion per axis
    fn set_linear_factor(&mut self, body: BodyHandle, factor: Vec3);

    /// Scale angular motion per axis
    fn set_angular_factor(&mut self, body: BodyHandle, factor: Vec3);

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32, filter: &dyn BroadphaseFilter);

    /// Pairs touching after the last step
    fn contacts(&self) -> &[ContactManifold];

    /// Nearest body hit by `ray` within `max_distance`
    fn raycast(&self, ray: &Ray, max_distance: f32, filter: &dyn BroadphaseFilter) -> Option<BackendRayHit>;

    /// Bodies overlapping `shape` placed at `position`/`rotation`
    fn query_overlaps(&self, shape: &CollisionShape, position: Vec3, rotation: Quat) -> Vec<BodyHandle>;

    /// Connect two bodies; `None` when either handle is unknown or the axis or limits are degenerate
    fn add_constraint(&mut self, a: BodyHandle, b: BodyHandle, desc: ConstraintDesc) -> Option<ConstraintHandle>;

    /// Remove a constraint; returns false for an unknown handle
    fn remove_constraint(&mut self, constraint: ConstraintHandle) -> bool;
}
