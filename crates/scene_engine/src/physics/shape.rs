//! Collision shapes shared between rigid bodies.
//!
//! Shapes are immutable once built and handed around as `Arc<CollisionShape>`,
//! so many bodies can reuse a single shape resource.

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::spatial::AABB;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building a shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A convex hull needs at least three points
    #[error("convex hull needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    /// A compound shape needs at least one child
    #[error("compound shape has no children")]
    EmptyCompound,

    /// Negative, zero or non-finite dimension
    #[error("invalid shape dimension: {0}")]
    InvalidDimension(&'static str),
}

/// Geometry used by the physics backend for collision detection
#[derive(Debug, Clone)]
pub enum CollisionShape {
    /// Sphere around the local origin
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Box around the local origin
    Box {
        /// Half size along each axis
        half_extents: Vec3,
    },
    /// Capsule along the local Y axis
    Capsule {
        /// Radius of the rounded ends
        radius: f32,
        /// Length of the straight section
        height: f32,
    },
    /// Cylinder along the local Y axis
    Cylinder {
        /// Cylinder radius
        radius: f32,
        /// Total height
        height: f32,
    },
    /// Cone along the local Y axis, apex up
    Cone {
        /// Base radius
        radius: f32,
        /// Total height
        height: f32,
    },
    /// Static plane `normal . p = offset` (in local space)
    InfinitePlane {
        /// Plane normal
        normal: Vec3,
        /// Offset along the normal
        offset: f32,
    },
    /// Convex hull of a point cloud
    ConvexHull {
        /// Hull points in local space
        points: Vec<Vec3>,
    },
    /// Several child shapes at local offsets
    Compound {
        /// Children with their local transforms
        children: Vec<(Transform, Arc<CollisionShape>)>,
    },
}

fn positive(value: f32, what: &'static str) -> Result<f32, ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ShapeError::InvalidDimension(what))
    }
}

impl CollisionShape {
    /// Sphere shape
    pub fn sphere(radius: f32) -> Result<Self, ShapeError> {
        Ok(Self::Sphere { radius: positive(radius, "sphere radius")? })
    }

    /// Box shape from its full size
    pub fn cuboid(size: Vec3) -> Result<Self, ShapeError> {
        positive(size.min(), "box size")?;
        Ok(Self::Box { half_extents: size * 0.5 })
    }

    /// Capsule shape
    pub fn capsule(radius: f32, height: f32) -> Result<Self, ShapeError> {
        Ok(Self::Capsule {
            radius: positive(radius, "capsule radius")?,
            height: positive(height, "capsule height")?,
        })
    }

    /// Cylinder shape
    pub fn cylinder(radius: f32, height: f32) -> Result<Self, ShapeError> {
        Ok(Self::Cylinder {
            radius: positive(radius, "cylinder radius")?,
            height: positive(height, "cylinder height")?,
        })
    }

    /// Cone shape
    pub fn cone(radius: f32, height: f32) -> Result<Self, ShapeError> {
        Ok(Self::Cone {
            radius: positive(radius, "cone radius")?,
            height: positive(height, "cone height")?,
        })
    }

    /// Infinite plane, only usable by static bodies
    pub fn plane(normal: Vec3, offset: f32) -> Result<Self, ShapeError> {
        let normal = normal
            .try_normalize(f32::EPSILON)
            .ok_or(ShapeError::InvalidDimension("plane normal"))?;
        Ok(Self::InfinitePlane { normal, offset })
    }

    /// Convex hull of `points`
    pub fn convex_hull(points: Vec<Vec3>) -> Result<Self, ShapeError> {
        if points.len() < 3 {
            return Err(ShapeError::TooFewPoints(points.len()));
        }
        Ok(Self::ConvexHull { points })
    }

    /// Compound of child shapes
    pub fn compound(children: Vec<(Transform, Arc<CollisionShape>)>) -> Result<Self, ShapeError> {
        if children.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }
        Ok(Self::Compound { children })
    }

    /// Whether this shape is unbounded
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::InfinitePlane { .. })
    }

    /// Furthest local point in direction `dir`
    pub fn support(&self, dir: Vec3) -> Vec3 {
        let dir = dir.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
        match self {
            Self::Sphere { radius } => dir * *radius,
            Self::Box { half_extents } => Vec3::new(
                half_extents.x.copysign(dir.x),
                half_extents.y.copysign(dir.y),
                half_extents.z.copysign(dir.z),
            ),
            Self::Capsule { radius, height } => {
                Vec3::new(0.0, (height * 0.5).copysign(dir.y), 0.0) + dir * *radius
            }
            Self::Cylinder { radius, height } => {
                let radial = Vec3::new(dir.x, 0.0, dir.z)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vec3::zeros);
                radial * *radius + Vec3::new(0.0, (height * 0.5).copysign(dir.y), 0.0)
            }
            Self::Cone { radius, height } => {
                let apex = Vec3::new(0.0, height * 0.5, 0.0);
                let radial = Vec3::new(dir.x, 0.0, dir.z)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vec3::zeros);
                let rim = radial * *radius - Vec3::new(0.0, height * 0.5, 0.0);
                if apex.dot(&dir) >= rim.dot(&dir) { apex } else { rim }
            }
            Self::InfinitePlane { normal, offset } => {
                // Only meaningful against -normal; other directions are unbounded
                *normal * *offset
            }
            Self::ConvexHull { points } => points
                .iter()
                .copied()
                .max_by(|a, b| a.dot(&dir).total_cmp(&b.dot(&dir)))
                .unwrap_or_else(Vec3::zeros),
            Self::Compound { children } => children
                .iter()
                .map(|(local, child)| {
                    let inner = child.support(local.rotation.inverse() * dir);
                    local.position + local.rotation * inner.component_mul(&local.scale)
                })
                .max_by(|a, b| a.dot(&dir).total_cmp(&b.dot(&dir)))
                .unwrap_or_else(Vec3::zeros),
        }
    }

    /// Radius of a sphere around the local origin enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half_extents } => half_extents.magnitude(),
            Self::Capsule { radius, height } => radius + height * 0.5,
            Self::Cylinder { radius, height } | Self::Cone { radius, height } => {
                (radius * radius + height * height * 0.25).sqrt()
            }
            Self::InfinitePlane { .. } => f32::INFINITY,
            Self::ConvexHull { points } => points.iter().map(|p| p.magnitude()).fold(0.0, f32::max),
            Self::Compound { children } => children
                .iter()
                .map(|(local, child)| local.position.magnitude() + child.bounding_radius() * local.scale.max())
                .fold(0.0, f32::max),
        }
    }

    /// World-space bounding box for the shape placed at `position`/`rotation`
    pub fn world_aabb(&self, position: Vec3, rotation: &Quat) -> AABB {
        if self.is_infinite() {
            return AABB::infinite();
        }
        let inverse = rotation.inverse();
        let extent = |axis: Vec3| (rotation * self.support(inverse * axis)).dot(&axis);
        let max = Vec3::new(extent(Vec3::x()), extent(Vec3::y()), extent(Vec3::z()));
        let min = Vec3::new(-extent(-Vec3::x()), -extent(-Vec3::y()), -extent(-Vec3::z()));
        AABB::new(position + min, position + max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convex_hull_needs_three_points() {
        let err = CollisionShape::convex_hull(vec![Vec3::zeros(), Vec3::x()]).unwrap_err();
        assert_eq!(err, ShapeError::TooFewPoints(2));
    }

    #[test]
    fn test_empty_compound_rejected() {
        assert_eq!(CollisionShape::compound(Vec::new()).unwrap_err(), ShapeError::EmptyCompound);
    }

    #[test]
    fn test_rotated_box_aabb_grows() {
        let shape = CollisionShape::cuboid(Vec3::new(2.0, 2.0, 2.0)).unwrap();
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_4);

        let aabb = shape.world_aabb(Vec3::new(10.0, 0.0, 0.0), &rotation);

        assert_relative_eq!(aabb.max.x, 10.0 + 2.0_f32.sqrt(), epsilon = 1e-4);
        assert_relative_eq!(aabb.max.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(aabb.min.y, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_compound_support_includes_offset_child() {
        let ball = Arc::new(CollisionShape::sphere(1.0).unwrap());
        let shape = CollisionShape::compound(vec![
            (Transform::from_position(Vec3::new(3.0, 0.0, 0.0)), ball.clone()),
            (Transform::identity(), ball),
        ])
        .unwrap();

        assert_relative_eq!(shape.support(Vec3::x()).x, 4.0, epsilon = 1e-5);
        assert_relative_eq!(shape.bounding_radius(), 4.0, epsilon = 1e-5);
    }
}
