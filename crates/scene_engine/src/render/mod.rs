//! Rendering: renderer registry, drawables, cameras, lights and the graphics
//! backend boundary.

pub mod backend;
mod camera;
mod drawable;
mod environment;
mod lighting;
mod renderer;

pub use backend::{
    AttributeFormat, BackendCall, BufferId, GraphicsBackend, Primitive, RecordingBackend, RenderTarget, UniformValue,
    Viewport,
};
pub use camera::{Camera, CameraView, Projection};
pub use drawable::{Drawable, Material, Mesh, Vertex, MAX_RENDER_GROUP};
pub use environment::EnvironmentRecorder;
pub use lighting::{Attenuation, Intensity, LightContainer, LightInfo, LightSource, LightType};
pub use renderer::{DrawStats, LightLimits, Renderer};
pub(crate) use renderer::{BindSlot, Visibility};
