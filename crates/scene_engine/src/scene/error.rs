//! Scene graph errors

use crate::foundation::reference::ReferenceError;
use crate::physics::PhysicsError;
use thiserror::Error;

/// Errors returned by scene operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Handle is expired or belongs to another scene
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// A live sibling already uses this name
    #[error("an object named '{0}' already exists under this parent")]
    DuplicateName(String),

    /// The new parent is the object itself or one of its descendants
    #[error("reparenting would make the object its own ancestor")]
    WouldCreateCycle,

    /// The implicit root object cannot be removed, cloned or moved
    #[error("operation not allowed on the scene root")]
    RootObject,

    /// The component exists but is not of the requested kind
    #[error("component is not a {0}")]
    WrongComponentKind(&'static str),

    /// The object is pending removal and accepts no new children or components
    #[error("object is pending removal")]
    PendingRemoval,

    /// The object already carries a rigid or phantom body
    #[error("object already has a physics body")]
    BodyAlreadyAttached,

    /// Physics registration failed
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
