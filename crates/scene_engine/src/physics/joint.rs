//! Constraints between two rigid bodies

use super::backend::{BodyHandle, ConstraintDesc, ConstraintHandle};
use crate::foundation::math::Vec3;
use crate::scene::{ComponentKey, SceneId};
use slotmap::new_key_type;

new_key_type! {
    /// Arena key of a joint
    pub struct JointKey;
}

/// Handle to a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointRef {
    pub(crate) scene: SceneId,
    pub(crate) key: JointKey,
}

/// Supported joint kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// Bodies keep their relative offset and orientation
    Weld,
    /// Bodies stay within `max_length` of each other
    Rope {
        /// Maximum distance between the body centers
        max_length: f32,
    },
    /// Hinge: the second body keeps its offset and only spins about `axis`
    Rotation {
        /// Hinge axis in world space at creation
        axis: Vec3,
    },
    /// Slider: the second body keeps its orientation and only moves along
    /// `axis`, between `min` and `max` from where it started
    Piston {
        /// Slide axis in world space at creation
        axis: Vec3,
        /// Lower travel limit
        min: f32,
        /// Upper travel limit
        max: f32,
    },
}

impl JointKind {
    pub(crate) fn desc(self) -> ConstraintDesc {
        match self {
            Self::Weld => ConstraintDesc::Weld,
            Self::Rope { max_length } => ConstraintDesc::Rope { max_length },
            Self::Rotation { axis } => ConstraintDesc::Hinge { axis },
            Self::Piston { axis, min, max } => ConstraintDesc::Slider { axis, min, max },
        }
    }
}

/// Live joint owned by the physics world
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) kind: JointKind,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) component_a: ComponentKey,
    pub(crate) component_b: ComponentKey,
    pub(crate) constraint: ConstraintHandle,
    pub(crate) collide_connected: bool,
}

impl Joint {
    /// Joint kind
    pub fn kind(&self) -> JointKind {
        self.kind
    }

    /// Whether the two connected bodies still collide with each other
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    pub(crate) fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }
}
