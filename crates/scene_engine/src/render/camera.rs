//! Camera component

use super::backend::{RenderTarget, Viewport};
use crate::config::CameraConfig;
use crate::foundation::math::{utils, Color, Mat4, Mat4Ext, Vec3};
use crate::spatial::Frustum;

/// Projection mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection, vertical field of view in radians
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width divided by height
        aspect: f32,
    },
    /// Orthographic projection of a `width` x `height` view volume
    Orthographic {
        /// View volume width
        width: f32,
        /// View volume height
        height: f32,
    },
}

/// What a drawable needs to know about the camera drawing it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// World to view transform
    pub view: Mat4,
    /// View to clip transform
    pub projection: Mat4,
    /// Camera position in world space
    pub position: Vec3,
}

impl CameraView {
    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Camera component
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Projection,
    near: f32,
    far: f32,
    viewport: Viewport,
    target: RenderTarget,
    mask: u32,
    clear_color: Color,
    projection_matrix: Mat4,
}

impl Camera {
    /// Perspective camera with the configured field of view and clip planes
    pub fn perspective(config: &CameraConfig, viewport: Viewport) -> Self {
        Self::with_projection(
            Projection::Perspective {
                fov_y: utils::deg_to_rad(config.field_of_view),
                aspect: viewport.aspect_ratio(),
            },
            config.perspective_near,
            config.perspective_far,
            viewport,
        )
    }

    /// Orthographic camera covering `width` x `height` world units
    pub fn orthographic(width: f32, height: f32, config: &CameraConfig, viewport: Viewport) -> Self {
        Self::with_projection(
            Projection::Orthographic { width, height },
            config.orthographic_near,
            config.orthographic_far,
            viewport,
        )
    }

    fn with_projection(projection: Projection, near: f32, far: f32, viewport: Viewport) -> Self {
        let mut camera = Self {
            projection,
            near,
            far,
            viewport,
            target: RenderTarget::Main,
            mask: 1,
            clear_color: Color::BLACK,
            projection_matrix: Mat4::identity(),
        };
        camera.rebuild_projection();
        camera
    }

    fn rebuild_projection(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov_y, aspect } => Mat4::perspective(fov_y, aspect, self.near, self.far),
            Projection::Orthographic { width, height } => Mat4::orthographic(width, height, self.near, self.far),
        };
    }

    /// Projection mode
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Switch projection mode
    pub fn set_projection(&mut self, projection: Projection) -> &mut Self {
        self.projection = projection;
        self.rebuild_projection();
        self
    }

    /// Set the vertical field of view in radians. Ignored by orthographic cameras.
    pub fn set_field_of_view(&mut self, fov_y: f32) -> &mut Self {
        if let Projection::Perspective { aspect, .. } = self.projection {
            self.projection = Projection::Perspective { fov_y, aspect };
            self.rebuild_projection();
        } else {
            log::warn!("set_field_of_view called on an orthographic camera");
        }
        self
    }

    /// Near and far clip planes
    pub fn clipping_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Set near and far clipping planes
    pub fn set_clipping_planes(&mut self, near: f32, far: f32) -> &mut Self {
        self.near = near;
        self.far = far;
        self.rebuild_projection();
        self
    }

    /// Viewport in pixels
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Change the viewport. Perspective cameras follow its aspect ratio.
    pub fn set_viewport(&mut self, viewport: Viewport) -> &mut Self {
        self.viewport = viewport;
        if let Projection::Perspective { fov_y, .. } = self.projection {
            self.projection = Projection::Perspective { fov_y, aspect: viewport.aspect_ratio() };
            self.rebuild_projection();
        }
        self
    }

    /// Where this camera draws
    pub fn render_target(&self) -> RenderTarget {
        self.target
    }

    /// Draw into `target` instead
    pub fn set_render_target(&mut self, target: RenderTarget) -> &mut Self {
        self.target = target;
        self
    }

    /// Render groups this camera draws
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Set the render mask
    pub fn set_mask(&mut self, mask: u32) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Color the target is cleared to
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: Color) -> &mut Self {
        self.clear_color = color;
        self
    }

    /// Cached projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// View data for a camera placed at `world`
    pub fn view(&self, world: &Mat4) -> CameraView {
        CameraView {
            view: world.try_inverse().unwrap_or_else(Mat4::identity),
            projection: self.projection_matrix,
            position: utils::translation(world),
        }
    }

    /// View frustum for a camera placed at `world`
    pub fn frustum(&self, world: &Mat4) -> Frustum {
        Frustum::from_matrix(&self.view(world).view_projection())
    }

    /// Radius of a sphere around the camera that encloses its view volume
    pub fn culling_radius(&self) -> f32 {
        match self.projection {
            Projection::Perspective { fov_y, aspect } => {
                let t = (fov_y * 0.5).tan();
                self.far * (1.0 + t * t * (1.0 + aspect * aspect)).sqrt()
            }
            Projection::Orthographic { width, height } => {
                let depth = self.near.abs().max(self.far.abs());
                ((width * 0.5).powi(2) + (height * 0.5).powi(2) + depth * depth).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::BoundingSphere;
    use approx::assert_relative_eq;

    fn small_config() -> CameraConfig {
        CameraConfig { perspective_far: 100.0, ..CameraConfig::default() }
    }

    #[test]
    fn test_viewport_updates_aspect() {
        let mut camera = Camera::perspective(&small_config(), Viewport::full(100, 100));
        camera.set_viewport(Viewport::full(200, 100));

        match camera.projection() {
            Projection::Perspective { aspect, .. } => assert_relative_eq!(aspect, 2.0),
            other => panic!("unexpected projection {:?}", other),
        }
    }

    #[test]
    fn test_frustum_sees_ahead_not_behind() {
        let camera = Camera::perspective(&small_config(), Viewport::full(100, 100));
        let frustum = camera.frustum(&Mat4::identity());

        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)));
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0)));
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -200.0), 1.0)));
    }

    #[test]
    fn test_orthographic_culling_radius() {
        let camera = Camera::orthographic(6.0, 8.0, &CameraConfig::default(), Viewport::full(60, 80));
        assert_relative_eq!(camera.culling_radius(), (9.0_f32 + 16.0 + 1.0).sqrt());
    }

    #[test]
    fn test_view_is_inverse_of_world() {
        let camera = Camera::perspective(&small_config(), Viewport::full(100, 100));
        let world = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let view = camera.view(&world);

        assert_relative_eq!(view.view * world, Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(view.position, Vec3::new(1.0, 2.0, 3.0));
    }
}
