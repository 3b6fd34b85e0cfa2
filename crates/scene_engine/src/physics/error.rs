use super::shape::ShapeError;
use thiserror::Error;

/// Recoverable physics errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// A body handed to a joint lives in another world
    #[error("bodies belong to different physics worlds")]
    WorldMismatch,

    /// The component has no rigid body
    #[error("component is not a rigid body")]
    NotARigidBody,

    /// Both joint ends are the same body
    #[error("a joint cannot connect a body to itself")]
    SelfJoint,

    /// The backend refused to create the constraint
    #[error("backend rejected the constraint")]
    ConstraintRejected,

    /// Unbounded shapes cannot move
    #[error("infinite shapes can only be used by static bodies")]
    InfiniteShapeNotStatic,

    /// No collider registered for the component
    #[error("unknown collider")]
    UnknownCollider,

    /// Shape construction failed
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
