//! Scene graph: objects, components, and the scene that drives them

mod component;
mod error;
mod graph;
mod handle;
mod object;
#[allow(clippy::module_inception)]
mod scene;

#[cfg(test)]
mod tests;

pub use component::{Behaviour, Component, ComponentKind, ComponentType, UpdateContext};
pub use error::SceneError;
pub use handle::{ComponentKey, ComponentRef, ObjectKey, ObjectRef, SceneId};
pub use object::{Object, ObjectFlags, ObjectMut, ObjectState};
pub use scene::{Scene, SceneHooks};

pub(crate) use graph::Graph;
