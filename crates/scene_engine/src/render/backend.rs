//! Graphics backend boundary.
//!
//! The renderer and drawables only issue the calls below; binding them to a
//! real graphics API is up to the implementor. [`RecordingBackend`] keeps the
//! call stream in memory for headless runs and tests.

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Value assigned to a shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 3 component vector
    Vec3(Vec3),
    /// 4 component vector
    Vec4(Vec4),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Layout of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// Two floats
    Float2,
    /// Three floats
    Float3,
    /// Four floats
    Float4,
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Independent lines
    Lines,
    /// Points
    Points,
}

/// Identifier of a vertex buffer owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Where a pass renders to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTarget {
    /// The main window surface
    #[default]
    Main,
    /// Offscreen texture
    Texture(u32),
    /// One cube face of an environment map
    EnvironmentFace {
        /// Environment map id
        id: u32,
        /// Face index 0..6
        face: u8,
    },
}

/// Pixel rectangle inside a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a `width` x `height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Calls the core issues while drawing
pub trait GraphicsBackend {
    /// Select target and viewport for the following draws
    fn bind_target(&mut self, target: RenderTarget, viewport: Viewport);

    /// Bind (uploading if needed) a vertex buffer
    fn bind_vertex_buffer(&mut self, buffer: BufferId, data: &[u8]);

    /// Describe one vertex attribute of the bound buffer
    fn set_attribute(&mut self, slot: u32, format: AttributeFormat, stride: u32, offset: u32);

    /// Set a uniform by name
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Enable or disable depth writes
    fn set_depth_write(&mut self, enabled: bool);

    /// Draw `count` indices (or vertices) of the bound buffer
    fn draw(&mut self, primitive: Primitive, count: u32);
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `bind_target`
    BindTarget(RenderTarget, Viewport),
    /// `bind_vertex_buffer`
    BindVertexBuffer {
        /// Buffer id
        buffer: BufferId,
        /// Size of the uploaded data
        bytes: usize,
    },
    /// `set_attribute`
    SetAttribute {
        /// Attribute slot
        slot: u32,
        /// Attribute format
        format: AttributeFormat,
        /// Vertex stride
        stride: u32,
        /// Offset inside the vertex
        offset: u32,
    },
    /// `set_uniform`
    SetUniform(String, UniformValue),
    /// `set_depth_write`
    SetDepthWrite(bool),
    /// `draw`
    Draw(Primitive, u32),
}

/// Backend that records every call
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Calls in issue order
    pub calls: Vec<BackendCall>,
}

impl RecordingBackend {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draw calls recorded
    pub fn draw_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BackendCall::Draw(..))).count()
    }

    /// Every value assigned to the uniform `name`, in order
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetUniform(n, value) if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl GraphicsBackend for RecordingBackend {
    fn bind_target(&mut self, target: RenderTarget, viewport: Viewport) {
        self.calls.push(BackendCall::BindTarget(target, viewport));
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId, data: &[u8]) {
        self.calls.push(BackendCall::BindVertexBuffer { buffer, bytes: data.len() });
    }

    fn set_attribute(&mut self, slot: u32, format: AttributeFormat, stride: u32, offset: u32) {
        self.calls.push(BackendCall::SetAttribute { slot, format, stride, offset });
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.calls.push(BackendCall::SetUniform(name.to_string(), value));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetDepthWrite(enabled));
    }

    fn draw(&mut self, primitive: Primitive, count: u32) {
        self.calls.push(BackendCall::Draw(primitive, count));
    }
}
