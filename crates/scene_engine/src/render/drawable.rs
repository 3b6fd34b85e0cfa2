//! Drawable component and the geometry it draws

use super::backend::{AttributeFormat, BufferId, GraphicsBackend, Primitive, UniformValue};
use super::camera::CameraView;
use super::lighting::LightContainer;
use crate::foundation::math::{Color, Mat4, Vec3};
use crate::spatial::BoundingSphere;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// Highest render group index
pub const MAX_RENDER_GROUP: u8 = 31;

/// Interleaved vertex as uploaded to the backend
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object space position
    pub position: [f32; 3],
    /// Object space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size of one vertex in bytes
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Vertex from nalgebra vectors
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            uv,
        }
    }
}

/// Vertex data plus the buffer id the backend knows it by
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    buffer: BufferId,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    primitive: Primitive,
    bounds: BoundingSphere,
}

impl Mesh {
    /// Create a mesh. Its bounding sphere is centered on the vertex centroid.
    pub fn new(buffer: BufferId, vertices: Vec<Vertex>, indices: Vec<u32>, primitive: Primitive) -> Self {
        let bounds = bounding_sphere(&vertices);
        Self { buffer, vertices, indices, primitive, bounds }
    }

    /// Axis aligned box of the given full size centered on the origin
    pub fn cuboid(buffer: BufferId, size: Vec3) -> Self {
        let half = size * 0.5;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::x(), Vec3::y(), Vec3::z()),
            (-Vec3::x(), Vec3::y(), -Vec3::z()),
            (Vec3::y(), Vec3::z(), Vec3::x()),
            (-Vec3::y(), Vec3::z(), -Vec3::x()),
            (Vec3::z(), Vec3::y(), -Vec3::x()),
            (-Vec3::z(), Vec3::y(), Vec3::x()),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, side) in faces {
            let base = vertices.len() as u32;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = normal + side * u + up * v;
                let position = corner.component_mul(&half);
                vertices.push(Vertex::new(position, normal, [(u + 1.0) * 0.5, (v + 1.0) * 0.5]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(buffer, vertices, indices, Primitive::Triangles)
    }

    /// GPU buffer holding the vertices
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Vertex data
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Index data; empty for non-indexed meshes
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Primitive topology
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// Bounding sphere in model space
    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    fn element_count(&self) -> u32 {
        if self.indices.is_empty() {
            self.vertices.len() as u32
        } else {
            self.indices.len() as u32
        }
    }
}

fn bounding_sphere(vertices: &[Vertex]) -> BoundingSphere {
    if vertices.is_empty() {
        return BoundingSphere::new(Vec3::zeros(), 0.0);
    }
    let center = vertices
        .iter()
        .fold(Vec3::zeros(), |acc, v| acc + Vec3::from(v.position))
        / vertices.len() as f32;
    let radius = vertices
        .iter()
        .map(|v| (Vec3::from(v.position) - center).norm())
        .fold(0.0, f32::max);
    BoundingSphere::new(center, radius)
}

/// Surface settings that decide the draw bucket and base color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Base color
    pub diffuse: Color,
    /// Drawn after opaque geometry, back to front, without depth writes
    pub translucent: bool,
    /// Drawn after opaque geometry, before translucent geometry
    pub sky: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Color::WHITE,
            translucent: false,
            sky: false,
        }
    }
}

/// Component that puts geometry on screen
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    mesh: Option<Arc<Mesh>>,
    material: Material,
    render_group: u8,
    receive_lights: bool,
    cast_shadows: bool,
    bounds: BoundingSphere,
}

impl Default for Drawable {
    fn default() -> Self {
        Self {
            mesh: None,
            material: Material::default(),
            render_group: 0,
            receive_lights: true,
            cast_shadows: false,
            bounds: BoundingSphere::new(Vec3::zeros(), 0.0),
        }
    }
}

impl Drawable {
    /// Drawable showing `mesh`, bounded by the mesh's bounding sphere
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            bounds: mesh.bounds(),
            mesh: Some(mesh),
            ..Self::default()
        }
    }

    /// Mesh, if one is set
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Replace the mesh and take over its bounds
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) -> &mut Self {
        self.bounds = mesh.bounds();
        self.mesh = Some(mesh);
        self
    }

    /// Material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Replace the material
    pub fn set_material(&mut self, material: Material) -> &mut Self {
        self.material = material;
        self
    }

    /// Render group (0..=31)
    pub fn render_group(&self) -> u8 {
        self.render_group
    }

    /// Set the render group (0..=31). Out of range groups are clamped.
    pub fn set_render_group(&mut self, group: u8) -> &mut Self {
        if group > MAX_RENDER_GROUP {
            log::warn!("Render group {} out of range, clamping to {}", group, MAX_RENDER_GROUP);
        }
        self.render_group = group.min(MAX_RENDER_GROUP);
        self
    }

    /// Single bit for this drawable's render group
    pub fn group_bit(&self) -> u32 {
        1 << self.render_group
    }

    /// Whether light selection runs for this drawable
    pub fn receive_lights(&self) -> bool {
        self.receive_lights
    }

    /// Enable or disable lighting
    pub fn set_receive_lights(&mut self, receive: bool) -> &mut Self {
        self.receive_lights = receive;
        self
    }

    /// Whether the drawable casts shadows
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Enable or disable shadow casting
    pub fn set_cast_shadows(&mut self, cast: bool) -> &mut Self {
        self.cast_shadows = cast;
        self
    }

    /// Bounding sphere in model space
    pub fn local_bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// Override the bounds taken from the mesh
    pub fn set_local_bounds(&mut self, bounds: BoundingSphere) -> &mut Self {
        self.bounds = bounds;
        self
    }

    /// Bounding sphere after applying `model`
    pub fn world_bounds(&self, model: &Mat4) -> BoundingSphere {
        self.bounds.transformed(model)
    }

    /// Issue the backend calls for one draw. Visibility and light selection
    /// are decided by the caller.
    pub fn draw(&self, model: &Mat4, camera: &CameraView, lights: &LightContainer, backend: &mut dyn GraphicsBackend) {
        let Some(mesh) = &self.mesh else {
            return;
        };

        backend.bind_vertex_buffer(mesh.buffer(), bytemuck::cast_slice(mesh.vertices()));
        backend.set_attribute(0, AttributeFormat::Float3, Vertex::STRIDE, 0);
        backend.set_attribute(1, AttributeFormat::Float3, Vertex::STRIDE, 12);
        backend.set_attribute(2, AttributeFormat::Float2, Vertex::STRIDE, 24);

        backend.set_uniform("u_model", UniformValue::Mat4(*model));
        backend.set_uniform("u_view", UniformValue::Mat4(camera.view));
        backend.set_uniform("u_projection", UniformValue::Mat4(camera.projection));
        backend.set_uniform("u_camera_position", UniformValue::Vec3(camera.position));
        backend.set_uniform("u_color", UniformValue::Vec4(self.material.diffuse.to_vec4()));
        if self.receive_lights {
            lights.apply(backend);
        }

        backend.draw(mesh.primitive(), mesh.element_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{BackendCall, RecordingBackend};
    use approx::assert_relative_eq;

    fn camera_view() -> CameraView {
        CameraView {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            position: Vec3::zeros(),
        }
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 32);
        let vertex = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::z(), [0.5, 0.5]);
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_cuboid_bounds_enclose_corners() {
        let mesh = Mesh::cuboid(BufferId(1), Vec3::new(2.0, 2.0, 2.0));

        assert_eq!(mesh.vertices().len(), 24);
        assert_eq!(mesh.indices().len(), 36);
        assert_relative_eq!(mesh.bounds().radius, 3.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(mesh.bounds().center, Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_draw_issues_buffer_uniforms_and_draw() {
        let drawable = Drawable::new(Arc::new(Mesh::cuboid(BufferId(7), Vec3::new(1.0, 1.0, 1.0))));
        let mut backend = RecordingBackend::new();

        drawable.draw(&Mat4::identity(), &camera_view(), &LightContainer::new(), &mut backend);

        assert_eq!(backend.calls[0], BackendCall::BindVertexBuffer { buffer: BufferId(7), bytes: 24 * 32 });
        assert_eq!(backend.uniform_values("u_model"), vec![UniformValue::Mat4(Mat4::identity())]);
        assert_eq!(backend.uniform_values("u_num_point_lights"), vec![UniformValue::Int(0)]);
        assert_eq!(backend.calls.last(), Some(&BackendCall::Draw(Primitive::Triangles, 36)));
    }

    #[test]
    fn test_unlit_drawable_skips_light_block() {
        let mut drawable = Drawable::new(Arc::new(Mesh::cuboid(BufferId(1), Vec3::new(1.0, 1.0, 1.0))));
        drawable.set_receive_lights(false);
        let mut backend = RecordingBackend::new();

        drawable.draw(&Mat4::identity(), &camera_view(), &LightContainer::new(), &mut backend);

        assert!(backend.uniform_values("u_num_point_lights").is_empty());
        assert_eq!(backend.draw_count(), 1);
    }

    #[test]
    fn test_render_group_is_clamped() {
        let mut drawable = Drawable::default();
        drawable.set_render_group(40);
        assert_eq!(drawable.render_group(), MAX_RENDER_GROUP);
        assert_eq!(drawable.group_bit(), 1 << 31);
    }
}
