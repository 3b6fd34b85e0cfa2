//! Rigid body and phantom body components

use super::backend::{BodyHandle, Motion, PhysicsBackend};
use super::collision_layers::CollisionLayers;
use super::shape::CollisionShape;
use super::world::PhysicsWorld;
use crate::foundation::math::{Quat, Vec3};
use std::sync::Arc;

/// Simulation type of a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Immovable
    Static,
    /// Simulated; drives its object's transform
    Dynamic,
    /// Follows its object's transform, pushes dynamic bodies
    Kinematic,
    /// Simulated, reports overlaps only
    DynamicSensor,
    /// Follows its object, reports overlaps only
    KinematicSensor,
}

impl BodyType {
    pub(crate) fn motion(self) -> Motion {
        match self {
            Self::Static => Motion::Static,
            Self::Dynamic | Self::DynamicSensor => Motion::Dynamic,
            Self::Kinematic | Self::KinematicSensor => Motion::Kinematic,
        }
    }

    /// Whether contacts with this body only generate overlap notifications
    pub fn is_sensor(self) -> bool {
        matches!(self, Self::DynamicSensor | Self::KinematicSensor)
    }

    /// Whether the simulation owns the transform
    pub fn is_dynamic(self) -> bool {
        self.motion() == Motion::Dynamic
    }
}

/// Construction parameters of a rigid body
#[derive(Debug, Clone)]
pub struct RigidBodyInfo {
    /// Simulation type
    pub body_type: BodyType,
    /// Collision shape, shared between bodies
    pub shape: Arc<CollisionShape>,
    /// Mass; only dynamic bodies keep a non-zero mass
    pub mass: f32,
    /// Collision group bits
    pub group: u32,
    /// Groups this body collides with
    pub mask: u32,
    /// Friction coefficient
    pub friction: f32,
    /// Rolling friction coefficient
    pub rolling_friction: f32,
    /// Restitution coefficient
    pub restitution: f32,
}

impl RigidBodyInfo {
    /// Parameters with default material and filtering
    pub fn new(body_type: BodyType, shape: Arc<CollisionShape>, mass: f32) -> Self {
        Self {
            body_type,
            shape,
            mass,
            group: CollisionLayers::DEFAULT,
            mask: CollisionLayers::DEFAULT,
            friction: 0.5,
            rolling_friction: 0.0,
            restitution: 0.0,
        }
    }

    /// Set collision group and mask
    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Set friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Rigid body component
#[derive(Debug, Clone)]
pub struct RigidBody {
    info: RigidBodyInfo,
    pub(crate) body: Option<BodyHandle>,
}

impl RigidBody {
    /// Create the component; the backend body is created when it is attached
    pub fn new(info: RigidBodyInfo) -> Self {
        Self { info, body: None }
    }

    /// Simulation type
    pub fn body_type(&self) -> BodyType {
        self.info.body_type
    }

    /// Effective mass: zero unless the body is dynamic
    pub fn mass(&self) -> f32 {
        if self.info.body_type.is_dynamic() {
            self.info.mass
        } else {
            0.0
        }
    }

    /// Collision shape
    pub fn shape(&self) -> &Arc<CollisionShape> {
        &self.info.shape
    }

    /// Construction parameters
    pub fn info(&self) -> &RigidBodyInfo {
        &self.info
    }

    /// Copy of this body without a backend handle, used when cloning objects
    pub(crate) fn detached(&self) -> Self {
        Self::new(self.info.clone())
    }
}

/// How a phantom body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhantomType {
    /// Stays where it was created
    Static,
    /// Follows its object every frame
    Kinematic,
}

/// Ghost collider that only reports overlaps
#[derive(Debug, Clone)]
pub struct PhantomBody {
    shape: Arc<CollisionShape>,
    phantom_type: PhantomType,
    group: u32,
    mask: u32,
    pub(crate) body: Option<BodyHandle>,
}

impl PhantomBody {
    /// Create the component; the backend body is created when it is attached
    pub fn new(shape: Arc<CollisionShape>, phantom_type: PhantomType) -> Self {
        Self {
            shape,
            phantom_type,
            group: CollisionLayers::DEFAULT,
            mask: CollisionLayers::ALL,
            body: None,
        }
    }

    /// Set collision group and mask
    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Movement type
    pub fn phantom_type(&self) -> PhantomType {
        self.phantom_type
    }

    /// Collision shape
    pub fn shape(&self) -> &Arc<CollisionShape> {
        &self.shape
    }

    /// Collision group bits
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Groups this phantom reports overlaps with
    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub(crate) fn detached(&self) -> Self {
        Self { body: None, ..self.clone() }
    }
}

/// Mutable view over a live rigid body for applying forces and reading state
pub struct RigidBodyMut<'a> {
    pub(crate) world: &'a mut PhysicsWorld,
    pub(crate) body: BodyHandle,
    pub(crate) body_type: BodyType,
}

impl RigidBodyMut<'_> {
    fn backend(&mut self) -> &mut dyn PhysicsBackend {
        self.world.backend_mut()
    }

    /// Simulation type
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Position reported by the simulation
    pub fn position(&self) -> Vec3 {
        self.world.backend().transform(self.body).map_or_else(Vec3::zeros, |(p, _)| p)
    }

    /// Rotation reported by the simulation
    pub fn rotation(&self) -> Quat {
        self.world.backend().transform(self.body).map_or_else(Quat::identity, |(_, r)| r)
    }

    /// Current linear velocity
    pub fn linear_velocity(&self) -> Vec3 {
        self.world.backend().linear_velocity(self.body)
    }

    /// Current angular velocity
    pub fn angular_velocity(&self) -> Vec3 {
        self.world.backend().angular_velocity(self.body)
    }

    /// Move the body without simulating the path. The owner follows at the
    /// next sync.
    pub fn set_transform(&mut self, position: Vec3, rotation: Quat) -> &mut Self {
        let body = self.body;
        self.world.set_body_transform(body, position, rotation);
        self
    }

    /// Set linear velocity
    pub fn set_linear_velocity(&mut self, velocity: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().set_linear_velocity(body, velocity);
        self
    }

    /// Set angular velocity
    pub fn set_angular_velocity(&mut self, velocity: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().set_angular_velocity(body, velocity);
        self
    }

    /// Apply a force at an offset from the center of mass until the next step
    pub fn apply_force(&mut self, force: Vec3, offset: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().apply_force(body, force, offset);
        self
    }

    /// Apply a force through the center of mass
    pub fn apply_central_force(&mut self, force: Vec3) -> &mut Self {
        self.apply_force(force, Vec3::zeros())
    }

    /// Apply an impulse at an offset from the center of mass
    pub fn apply_impulse(&mut self, impulse: Vec3, offset: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().apply_impulse(body, impulse, offset);
        self
    }

    /// Apply an impulse through the center of mass
    pub fn apply_central_impulse(&mut self, impulse: Vec3) -> &mut Self {
        self.apply_impulse(impulse, Vec3::zeros())
    }

    /// Apply a torque until the next step
    pub fn apply_torque(&mut self, torque: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().apply_torque(body, torque);
        self
    }

    /// Drop pending forces and torques
    pub fn clear_forces(&mut self) -> &mut Self {
        let body = self.body;
        self.backend().clear_forces(body);
        self
    }

    /// Override gravity for this body; `None` restores the world gravity
    pub fn set_gravity(&mut self, gravity: Option<Vec3>) -> &mut Self {
        let body = self.body;
        self.backend().set_body_gravity(body, gravity);
        self
    }

    /// Restrict linear motion per axis (0 locks an axis)
    pub fn set_linear_factor(&mut self, factor: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().set_linear_factor(body, factor);
        self
    }

    /// Restrict angular motion per axis (0 locks an axis)
    pub fn set_angular_factor(&mut self, factor: Vec3) -> &mut Self {
        let body = self.body;
        self.backend().set_angular_factor(body, factor);
        self
    }
}
