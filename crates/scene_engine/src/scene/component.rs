//! Components: the closed set of capabilities an object can carry

use super::handle::{ComponentRef, ObjectKey, ObjectRef};
use super::scene::Scene;
use crate::physics::{PhantomBody, RigidBody};
use crate::render::{BindSlot, Camera, Drawable, EnvironmentRecorder, LightSource};
use std::fmt;

/// User logic attached to an object.
///
/// `update` runs once per frame during the tree traversal, `fixed_update`
/// once per physics tick. Both may change the scene through the context;
/// removals requested from here are deferred to the next sweep.
pub trait Behaviour: Send {
    /// Per-frame update
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32);

    /// Per physics tick update
    fn fixed_update(&mut self, _ctx: &mut UpdateContext<'_>, _dt: f32) {}

    /// Copy used when the owning object is cloned. `None` leaves the copy out.
    fn clone_boxed(&self) -> Option<Box<dyn Behaviour>> {
        None
    }

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Access handed to a running behaviour
pub struct UpdateContext<'a> {
    /// The scene being updated
    pub scene: &'a mut Scene,
    /// Object owning the behaviour
    pub object: ObjectRef,
    /// The behaviour's own component
    pub component: ComponentRef,
}

/// Occupies a behaviour slot while its behaviour runs
pub(crate) struct Detached;

impl Behaviour for Detached {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>, _dt: f32) {}
}

/// Component payload
pub enum ComponentKind {
    /// Geometry drawn by the renderer
    Drawable(Drawable),
    /// Viewpoint the renderer draws from
    Camera(Camera),
    /// Light considered by light selection
    Light(LightSource),
    /// Cube map recorder
    EnvironmentRecorder(EnvironmentRecorder),
    /// Simulated body
    RigidBody(RigidBody),
    /// Overlap-only ghost
    Phantom(PhantomBody),
    /// User logic
    Behaviour(Box<dyn Behaviour>),
}

/// Type tag of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// [`ComponentKind::Drawable`]
    Drawable,
    /// [`ComponentKind::Camera`]
    Camera,
    /// [`ComponentKind::Light`]
    Light,
    /// [`ComponentKind::EnvironmentRecorder`]
    EnvironmentRecorder,
    /// [`ComponentKind::RigidBody`]
    RigidBody,
    /// [`ComponentKind::Phantom`]
    Phantom,
    /// [`ComponentKind::Behaviour`]
    Behaviour,
}

impl ComponentType {
    /// Name used in logs and debug output
    pub fn name(self) -> &'static str {
        match self {
            Self::Drawable => "drawable",
            Self::Camera => "camera",
            Self::Light => "light source",
            Self::EnvironmentRecorder => "environment recorder",
            Self::RigidBody => "rigid body",
            Self::Phantom => "phantom body",
            Self::Behaviour => "behaviour",
        }
    }
}

impl ComponentKind {
    /// Discriminant of this payload
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Drawable(_) => ComponentType::Drawable,
            Self::Camera(_) => ComponentType::Camera,
            Self::Light(_) => ComponentType::Light,
            Self::EnvironmentRecorder(_) => ComponentType::EnvironmentRecorder,
            Self::RigidBody(_) => ComponentType::RigidBody,
            Self::Phantom(_) => ComponentType::Phantom,
            Self::Behaviour(_) => ComponentType::Behaviour,
        }
    }

    /// Renderer set this kind binds into
    pub(crate) fn bind_slot(&self) -> Option<BindSlot> {
        match self {
            Self::Drawable(_) => Some(BindSlot::Drawable),
            Self::Camera(_) => Some(BindSlot::Camera),
            Self::Light(_) => Some(BindSlot::Light),
            Self::EnvironmentRecorder(_) => Some(BindSlot::EnvironmentRecorder),
            _ => None,
        }
    }

    /// Unbound copy for another object, `None` when the kind cannot be copied
    pub(crate) fn duplicate(&self) -> Option<Self> {
        Some(match self {
            Self::Drawable(d) => Self::Drawable(d.clone()),
            Self::Camera(c) => Self::Camera(c.clone()),
            Self::Light(l) => Self::Light(l.clone()),
            Self::EnvironmentRecorder(e) => Self::EnvironmentRecorder(e.clone()),
            Self::RigidBody(r) => Self::RigidBody(r.detached()),
            Self::Phantom(p) => Self::Phantom(p.detached()),
            Self::Behaviour(b) => Self::Behaviour(b.clone_boxed()?),
        })
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drawable(d) => f.debug_tuple("Drawable").field(d).finish(),
            Self::Camera(c) => f.debug_tuple("Camera").field(c).finish(),
            Self::Light(l) => f.debug_tuple("Light").field(l).finish(),
            Self::EnvironmentRecorder(e) => f.debug_tuple("EnvironmentRecorder").field(e).finish(),
            Self::RigidBody(r) => f.debug_tuple("RigidBody").field(r).finish(),
            Self::Phantom(p) => f.debug_tuple("Phantom").field(p).finish(),
            Self::Behaviour(b) => f.debug_tuple("Behaviour").field(&b.name()).finish(),
        }
    }
}

/// A component slot in the scene arena
#[derive(Debug)]
pub struct Component {
    pub(crate) owner: ObjectKey,
    pub(crate) id: u32,
    pub(crate) active: bool,
    pub(crate) pending_removal: bool,
    pub(crate) kind: ComponentKind,
}

impl Component {
    pub(crate) fn new(owner: ObjectKey, kind: ComponentKind) -> Self {
        Self {
            owner,
            id: 0,
            active: true,
            pending_removal: false,
            kind,
        }
    }

    /// Payload
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Discriminant of the payload
    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }

    /// User tag
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether updates and drawing consider this component
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether removal was requested during a traversal
    pub fn is_pending_removal(&self) -> bool {
        self.pending_removal
    }

    /// Drawable payload, if this is one
    pub fn as_drawable(&self) -> Option<&Drawable> {
        match &self.kind {
            ComponentKind::Drawable(d) => Some(d),
            _ => None,
        }
    }

    /// Camera payload, if this is one
    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            ComponentKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    /// Light payload, if this is one
    pub fn as_light(&self) -> Option<&LightSource> {
        match &self.kind {
            ComponentKind::Light(l) => Some(l),
            _ => None,
        }
    }

    /// Environment recorder payload, if this is one
    pub fn as_environment_recorder(&self) -> Option<&EnvironmentRecorder> {
        match &self.kind {
            ComponentKind::EnvironmentRecorder(e) => Some(e),
            _ => None,
        }
    }

    /// Rigid body payload, if this is one
    pub fn as_rigid_body(&self) -> Option<&RigidBody> {
        match &self.kind {
            ComponentKind::RigidBody(r) => Some(r),
            _ => None,
        }
    }

    /// Phantom payload, if this is one
    pub fn as_phantom(&self) -> Option<&PhantomBody> {
        match &self.kind {
            ComponentKind::Phantom(p) => Some(p),
            _ => None,
        }
    }
}
