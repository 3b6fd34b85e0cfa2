//! Physics module
//!
//! Wraps a simulation backend behind [`PhysicsWorld`], provides the rigid body
//! and phantom components, joints, raycasts and contact listeners, and the
//! culling collider tags the renderer uses for visibility.

pub mod backend;
mod body;
pub mod collision_layers;
mod contact;
pub mod culling;
mod error;
mod joint;
pub mod shape;
mod world;

pub use backend::{PhysicsBackend, SimpleBackend};
pub use body::{BodyType, PhantomBody, PhantomType, RigidBody, RigidBodyInfo, RigidBodyMut};
pub use collision_layers::CollisionLayers;
pub use contact::{ContactInfo, ContactListener, ListenerRef, RayInfo};
pub use culling::CullingType;
pub use error::PhysicsError;
pub use joint::{Joint, JointKey, JointKind, JointRef};
pub use shape::{CollisionShape, ShapeError};
pub use world::{PhysicsWorld, WorldId};

pub(crate) use world::ColliderKind;
