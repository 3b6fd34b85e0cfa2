//! Spatial primitives
//!
//! Bounding volumes, rays and frustums shared by the renderer (visibility and
//! light selection) and the physics backend (broadphase and raycasts).

mod bounds;

pub use bounds::{Frustum, Plane, Ray, AABB, BoundingSphere};
