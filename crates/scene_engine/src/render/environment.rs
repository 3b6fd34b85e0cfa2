//! Environment map recorder

use super::backend::{RenderTarget, Viewport};
use super::camera::CameraView;
use crate::foundation::math::{constants::PI, Mat4, Mat4Ext, Vec3};
use crate::spatial::BoundingSphere;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ENVIRONMENT_MAP: AtomicU32 = AtomicU32::new(1);

/// (look direction, up) for the six cube faces: +X, -X, +Y, -Y, +Z, -Z
const FACES: [([f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
];

/// Records the drawables around its owner into a cube map every frame
#[derive(Debug, PartialEq)]
pub struct EnvironmentRecorder {
    map: u32,
    resolution: u32,
    range: f32,
    mask: u32,
}

impl Clone for EnvironmentRecorder {
    /// Copies settings into a new cube map
    fn clone(&self) -> Self {
        Self {
            map: NEXT_ENVIRONMENT_MAP.fetch_add(1, Ordering::Relaxed),
            ..*self
        }
    }
}

impl EnvironmentRecorder {
    /// Recorder with a fresh cube map of `resolution` pixels per face
    pub fn new(resolution: u32, range: f32) -> Self {
        Self {
            map: NEXT_ENVIRONMENT_MAP.fetch_add(1, Ordering::Relaxed),
            resolution,
            range,
            mask: 1,
        }
    }

    /// Cube map id used in [`RenderTarget::EnvironmentFace`]
    pub fn map_id(&self) -> u32 {
        self.map
    }

    /// Pixels per cube face edge
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Recording distance
    pub fn range(&self) -> f32 {
        self.range
    }

    /// Set the recording distance
    pub fn set_range(&mut self, range: f32) -> &mut Self {
        self.range = range;
        self
    }

    /// Render mask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Set the render mask
    pub fn set_mask(&mut self, mask: u32) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Sphere of everything this recorder can see from `position`
    pub fn reach(&self, position: Vec3) -> BoundingSphere {
        BoundingSphere::new(position, self.range)
    }

    /// Target, viewport and camera for each cube face
    pub fn faces(&self, position: Vec3) -> impl Iterator<Item = (RenderTarget, Viewport, CameraView)> + '_ {
        let projection = Mat4::perspective(PI * 0.5, 1.0, 0.1, self.range.max(0.2));
        FACES.iter().enumerate().map(move |(i, (look, up))| {
            let view = Mat4::look_at(position, position + Vec3::from(*look), Vec3::from(*up));
            (
                RenderTarget::EnvironmentFace { id: self.map, face: i as u8 },
                Viewport::full(self.resolution, self.resolution),
                CameraView { view, projection, position },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_faces_with_distinct_targets() {
        let recorder = EnvironmentRecorder::new(64, 10.0);
        let faces: Vec<_> = recorder.faces(Vec3::zeros()).collect();

        assert_eq!(faces.len(), 6);
        for (i, (target, viewport, _)) in faces.iter().enumerate() {
            assert_eq!(*target, RenderTarget::EnvironmentFace { id: recorder.map_id(), face: i as u8 });
            assert_eq!(viewport.width, 64);
        }
    }

    #[test]
    fn test_clone_records_into_new_map() {
        let recorder = EnvironmentRecorder::new(32, 5.0);
        let copy = recorder.clone();
        assert_ne!(copy.map_id(), recorder.map_id());
        assert_eq!(copy.range(), recorder.range());
    }
}
