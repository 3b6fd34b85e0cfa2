//! Built-in rigid body backend.
//!
//! Semi-implicit Euler integration, sort-and-sweep broadphase on world AABBs,
//! closed-form narrowphase for sphere/box/plane pairs (AABB overlap for the
//! rest), linear impulse response and positional constraint projection.

use super::{
    BackendRayHit, BodyDesc, BodyHandle, BroadphaseFilter, ConstraintDesc, ConstraintHandle,
    ContactManifold, Motion, PairResponse, PhysicsBackend,
};
use crate::foundation::math::{Quat, Vec3};
use crate::physics::shape::CollisionShape;
use crate::spatial::{BoundingSphere, Plane, Ray, AABB};
use slotmap::SlotMap;
use std::sync::Arc;

/// Penetration tolerated before positional correction kicks in
const SLOP: f32 = 0.005;
/// Fraction of the remaining penetration removed per step
const CORRECTION: f32 = 0.8;

#[derive(Debug, Clone)]
struct SimBody {
    shape: Arc<CollisionShape>,
    motion: Motion,
    inv_mass: f32,
    inv_inertia: f32,
    position: Vec3,
    rotation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    gravity: Option<Vec3>,
    linear_factor: Vec3,
    angular_factor: Vec3,
    friction: f32,
    restitution: f32,
    contact_response: bool,
}

#[derive(Debug, Clone)]
struct SimConstraint {
    a: BodyHandle,
    b: BodyHandle,
    desc: ConstraintDesc,
    local_offset: Vec3,
    relative_rotation: Quat,
    // Constraint axis in each body's local frame
    axis_a: Vec3,
    axis_b: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    point: Vec3,
    normal: Vec3,
    depth: f32,
}

impl Hit {
    fn flipped(self) -> Self {
        Self { normal: -self.normal, ..self }
    }
}

/// Dependency-free rigid body simulation
pub struct SimpleBackend {
    gravity: Vec3,
    bodies: SlotMap<BodyHandle, SimBody>,
    constraints: SlotMap<ConstraintHandle, SimConstraint>,
    contacts: Vec<ContactManifold>,
    solver_iterations: u32,
}

impl Default for SimpleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBackend {
    /// Create an empty backend with zero gravity
    pub fn new() -> Self {
        Self {
            gravity: Vec3::zeros(),
            bodies: SlotMap::with_key(),
            constraints: SlotMap::with_key(),
            contacts: Vec::new(),
            solver_iterations: 4,
        }
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            match body.motion {
                Motion::Static => continue,
                Motion::Dynamic => {
                    let acceleration = body.gravity.unwrap_or(gravity) + body.force * body.inv_mass;
                    body.linear_velocity += acceleration.component_mul(&body.linear_factor) * dt;
                    body.angular_velocity +=
                        (body.torque * body.inv_inertia).component_mul(&body.angular_factor) * dt;
                }
                Motion::Kinematic => {}
            }

            body.position += body.linear_velocity * dt;
            let spin = body.angular_velocity * dt;
            if spin.magnitude_squared() > 0.0 {
                body.rotation = Quat::from_scaled_axis(spin) * body.rotation;
            }
            body.force = Vec3::zeros();
            body.torque = Vec3::zeros();
        }
    }

    fn solve_constraints(&mut self) {
        for _ in 0..self.solver_iterations {
            for constraint in self.constraints.values() {
                let (Some(a), Some(b)) = (self.bodies.get(constraint.a), self.bodies.get(constraint.b)) else {
                    continue;
                };
                let (mut a, mut b) = (a.clone(), b.clone());
                let (wa, wb) = (a.inv_mass, b.inv_mass);
                let total = wa + wb;
                if total <= 0.0 {
                    continue;
                }

                match constraint.desc {
                    ConstraintDesc::Weld => {
                        let target = a.position + a.rotation * constraint.local_offset;
                        let error = target - b.position;
                        a.position -= error * (wa / total);
                        b.position += error * (wb / total);

                        let shared = (a.linear_velocity * wb + b.linear_velocity * wa) / total;
                        a.linear_velocity = shared;
                        b.linear_velocity = shared;
                        if wb > 0.0 {
                            b.rotation = a.rotation * constraint.relative_rotation;
                            b.angular_velocity = a.angular_velocity;
                        }
                    }
                    ConstraintDesc::Hinge { .. } => {
                        let target = a.position + a.rotation * constraint.local_offset;
                        let error = target - b.position;
                        a.position -= error * (wa / total);
                        b.position += error * (wb / total);

                        let shared = (a.linear_velocity * wb + b.linear_velocity * wa) / total;
                        a.linear_velocity = shared;
                        b.linear_velocity = shared;
                        if wb > 0.0 {
                            let axis = a.rotation * constraint.axis_a;
                            if let Some(align) = Quat::rotation_between(&(b.rotation * constraint.axis_b), &axis) {
                                b.rotation = align * b.rotation;
                            }
                            let spin = (b.angular_velocity - a.angular_velocity).dot(&axis);
                            b.angular_velocity = a.angular_velocity + axis * spin;
                        }
                    }
                    ConstraintDesc::Slider { min, max, .. } => {
                        let axis = a.rotation * constraint.axis_a;
                        let rest = a.position + a.rotation * constraint.local_offset;
                        let travel = (b.position - rest).dot(&axis);
                        let clamped = travel.clamp(min, max);
                        let error = rest + axis * clamped - b.position;
                        a.position -= error * (wa / total);
                        b.position += error * (wb / total);

                        let relative = b.linear_velocity - a.linear_velocity;
                        let along = relative.dot(&axis);
                        let blocked = (travel >= max && along > 0.0) || (travel <= min && along < 0.0);
                        let kept = if blocked { 0.0 } else { along };
                        let correction = relative - axis * kept;
                        a.linear_velocity += correction * (wa / total);
                        b.linear_velocity -= correction * (wb / total);
                        if wb > 0.0 {
                            b.rotation = a.rotation * constraint.relative_rotation;
                            b.angular_velocity = a.angular_velocity;
                        }
                    }
                    ConstraintDesc::Rope { max_length } => {
                        let delta = b.position - a.position;
                        let length = delta.magnitude();
                        if length > max_length && length > f32::EPSILON {
                            let n = delta / length;
                            let error = length - max_length;
                            a.position += n * (error * wa / total);
                            b.position -= n * (error * wb / total);

                            let separating = (b.linear_velocity - a.linear_velocity).dot(&n);
                            if separating > 0.0 {
                                a.linear_velocity += n * (separating * wa / total);
                                b.linear_velocity -= n * (separating * wb / total);
                            }
                        }
                    }
                }

                self.bodies[constraint.a] = a;
                self.bodies[constraint.b] = b;
            }
        }
    }

    fn broadphase(&self, filter: &dyn BroadphaseFilter) -> Vec<(BodyHandle, BodyHandle, PairResponse)> {
        let mut entries: Vec<(BodyHandle, AABB)> = self
            .bodies
            .iter()
            .map(|(handle, body)| (handle, body.shape.world_aabb(body.position, &body.rotation)))
            .collect();
        entries.sort_by(|l, r| l.1.min.x.total_cmp(&r.1.min.x));

        let mut pairs = Vec::new();
        for (i, (handle_a, aabb_a)) in entries.iter().enumerate() {
            for (handle_b, aabb_b) in &entries[i + 1..] {
                if aabb_b.min.x > aabb_a.max.x {
                    break;
                }
                if !aabb_a.intersects(aabb_b) {
                    continue;
                }
                let both_static = self.bodies[*handle_a].motion == Motion::Static
                    && self.bodies[*handle_b].motion == Motion::Static;
                if both_static {
                    continue;
                }
                let response = filter.pair_response(*handle_a, *handle_b);
                if response != PairResponse::Ignore {
                    pairs.push((*handle_a, *handle_b, response));
                }
            }
        }
        pairs
    }

    fn resolve(&mut self, a: BodyHandle, b: BodyHandle, hit: &Hit) {
        let (mut body_a, mut body_b) = (self.bodies[a].clone(), self.bodies[b].clone());
        if !body_a.contact_response || !body_b.contact_response {
            return;
        }
        let (wa, wb) = (body_a.inv_mass, body_b.inv_mass);
        let total = wa + wb;
        if total <= 0.0 {
            return;
        }
        let n = hit.normal;

        let correction = n * ((hit.depth - SLOP).max(0.0) * CORRECTION / total);
        body_a.position -= correction * wa;
        body_b.position += correction * wb;

        let relative = body_b.linear_velocity - body_a.linear_velocity;
        let normal_speed = relative.dot(&n);
        if normal_speed < 0.0 {
            let restitution = body_a.restitution * body_b.restitution;
            let j = -(1.0 + restitution) * normal_speed / total;
            body_a.linear_velocity -= n * (j * wa);
            body_b.linear_velocity += n * (j * wb);

            let tangent_velocity = relative - n * normal_speed;
            if let Some(tangent) = tangent_velocity.try_normalize(f32::EPSILON) {
                let friction = body_a.friction * body_b.friction;
                let jt = (-relative.dot(&tangent) / total).clamp(-friction * j, friction * j);
                body_a.linear_velocity -= tangent * (jt * wa);
                body_b.linear_velocity += tangent * (jt * wb);
            }
        }

        self.bodies[a] = body_a;
        self.bodies[b] = body_b;
    }
}

fn collide(
    shape_a: &CollisionShape,
    position_a: Vec3,
    rotation_a: &Quat,
    shape_b: &CollisionShape,
    position_b: Vec3,
    rotation_b: &Quat,
) -> Option<Hit> {
    use CollisionShape as S;
    match (shape_a, shape_b) {
        (S::InfinitePlane { .. }, S::InfinitePlane { .. }) => None,
        (S::InfinitePlane { normal, offset }, other) => {
            plane_vs_convex(*normal, *offset, position_a, rotation_a, other, position_b, rotation_b)
        }
        (other, S::InfinitePlane { normal, offset }) => {
            plane_vs_convex(*normal, *offset, position_b, rotation_b, other, position_a, rotation_a)
                .map(Hit::flipped)
        }
        (S::Sphere { radius: ra }, S::Sphere { radius: rb }) => {
            let delta = position_b - position_a;
            let distance = delta.magnitude();
            if distance > ra + rb {
                return None;
            }
            let normal = delta.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
            Some(Hit {
                point: position_a + normal * *ra,
                normal,
                depth: ra + rb - distance,
            })
        }
        (S::Box { half_extents }, S::Sphere { radius }) => {
            box_vs_sphere(*half_extents, position_a, rotation_a, *radius, position_b)
        }
        (S::Sphere { radius }, S::Box { half_extents }) => {
            box_vs_sphere(*half_extents, position_b, rotation_b, *radius, position_a).map(Hit::flipped)
        }
        _ => aabb_overlap(
            &shape_a.world_aabb(position_a, rotation_a),
            &shape_b.world_aabb(position_b, rotation_b),
        ),
    }
}

/// Normal points from the plane towards the other shape.
fn plane_vs_convex(
    local_normal: Vec3,
    offset: f32,
    plane_position: Vec3,
    plane_rotation: &Quat,
    other: &CollisionShape,
    position: Vec3,
    rotation: &Quat,
) -> Option<Hit> {
    let normal = plane_rotation * local_normal;
    let origin = plane_position + normal * offset;
    let deepest = position + rotation * other.support(rotation.inverse() * -normal);
    let distance = normal.dot(&(deepest - origin));
    (distance < 0.0).then_some(Hit {
        point: deepest,
        normal,
        depth: -distance,
    })
}

/// Normal points from the box towards the sphere.
fn box_vs_sphere(half: Vec3, box_position: Vec3, box_rotation: &Quat, radius: f32, center: Vec3) -> Option<Hit> {
    let local = box_rotation.inverse() * (center - box_position);
    let closest = AABB::new(-half, half).closest_point(local);
    let delta = local - closest;
    let distance = delta.magnitude();

    let (local_normal, depth) = if distance > f32::EPSILON {
        if distance > radius {
            return None;
        }
        (delta / distance, radius - distance)
    } else {
        // Center inside the box: push out along the shallowest axis
        let penetration = half - local.abs();
        let axis = penetration.imin();
        let mut n = Vec3::zeros();
        n[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        (n, penetration[axis] + radius)
    };

    Some(Hit {
        point: box_position + box_rotation * closest,
        normal: box_rotation * local_normal,
        depth,
    })
}

fn aabb_overlap(a: &AABB, b: &AABB) -> Option<Hit> {
    if !a.intersects(b) {
        return None;
    }
    let lo = a.min.sup(&b.min);
    let hi = a.max.inf(&b.max);
    let overlap = hi - lo;
    let axis = overlap.imin();
    let mut normal = Vec3::zeros();
    normal[axis] = if b.center()[axis] >= a.center()[axis] { 1.0 } else { -1.0 };
    Some(Hit {
        point: (lo + hi) * 0.5,
        normal,
        depth: overlap[axis],
    })
}

fn ray_vs_shape(ray: &Ray, shape: &CollisionShape, position: Vec3, rotation: &Quat) -> Option<(f32, Vec3)> {
    match shape {
        CollisionShape::Sphere { radius } => BoundingSphere::new(position, *radius)
            .intersect_ray(ray)
            .map(|(t, _, normal)| (t, normal)),
        CollisionShape::Box { half_extents } => {
            let inverse = rotation.inverse();
            let local_ray = Ray {
                origin: inverse * (ray.origin - position),
                direction: inverse * ray.direction,
            };
            let t = AABB::new(-half_extents, *half_extents).intersect_ray(&local_ray)?;
            let local_point = local_ray.point_at(t).component_div(half_extents);
            let axis = local_point.abs().imax();
            let mut normal = Vec3::zeros();
            normal[axis] = local_point[axis].signum();
            Some((t, rotation * normal))
        }
        CollisionShape::InfinitePlane { normal, offset } => {
            let normal = rotation * normal;
            let origin = position + normal * *offset;
            let plane = Plane::new(normal, -normal.dot(&origin));
            plane.intersect_ray(ray).map(|t| (t, normal))
        }
        other => BoundingSphere::new(position, other.bounding_radius())
            .intersect_ray(ray)
            .map(|(t, _, normal)| (t, normal)),
    }
}

impl PhysicsBackend for SimpleBackend {
    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let dynamic = desc.motion == Motion::Dynamic && desc.mass > 0.0;
        let inv_mass = if dynamic { 1.0 / desc.mass } else { 0.0 };
        let radius = desc.shape.bounding_radius();
        let inv_inertia = if dynamic && radius.is_finite() && radius > 0.0 {
            1.0 / (0.4 * desc.mass * radius * radius)
        } else {
            0.0
        };

        self.bodies.insert(SimBody {
            shape: Arc::clone(&desc.shape),
            motion: desc.motion,
            inv_mass,
            inv_inertia,
            position: desc.position,
            rotation: desc.rotation,
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            gravity: None,
            linear_factor: Vec3::repeat(1.0),
            angular_factor: Vec3::repeat(1.0),
            friction: desc.friction,
            restitution: desc.restitution,
            contact_response: desc.contact_response,
        })
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        let removed = self.bodies.remove(body).is_some();
        if removed {
            self.constraints.retain(|_, c| c.a != body && c.b != body);
            self.contacts.retain(|c| c.a != body && c.b != body);
        }
        removed
    }

    fn set_shape(&mut self, body: BodyHandle, shape: Arc<CollisionShape>) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.shape = shape;
        }
    }

    fn set_transform(&mut self, body: BodyHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.position = position;
            body.rotation = rotation;
        }
    }

    fn transform(&self, body: BodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies.get(body).map(|b| (b.position, b.rotation))
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.linear_velocity = velocity;
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.bodies.get(body).map_or_else(Vec3::zeros, |b| b.linear_velocity)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.angular_velocity = velocity;
        }
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.bodies.get(body).map_or_else(Vec3::zeros, |b| b.angular_velocity)
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3, offset: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.force += force;
            body.torque += offset.cross(&force);
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, offset: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.linear_velocity += (impulse * body.inv_mass).component_mul(&body.linear_factor);
            body.angular_velocity +=
                (offset.cross(&impulse) * body.inv_inertia).component_mul(&body.angular_factor);
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.torque += torque;
        }
    }

    fn clear_forces(&mut self, body: BodyHandle) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.force = Vec3::zeros();
            body.torque = Vec3::zeros();
        }
    }

    fn set_body_gravity(&mut self, body: BodyHandle, gravity: Option<Vec3>) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.gravity = gravity;
        }
    }

    fn set_linear_factor(&mut self, body: BodyHandle, factor: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.linear_factor = factor;
            body.linear_velocity = body.linear_velocity.component_mul(&factor);
        }
    }

    fn set_angular_factor(&mut self, body: BodyHandle, factor: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.angular_factor = factor;
            body.angular_velocity = body.angular_velocity.component_mul(&factor);
        }
    }

    fn step(&mut self, dt: f32, filter: &dyn BroadphaseFilter) {
        self.integrate(dt);
        self.solve_constraints();

        let mut contacts = Vec::new();
        for (a, b, response) in self.broadphase(filter) {
            let hit = {
                let (body_a, body_b) = (&self.bodies[a], &self.bodies[b]);
                collide(
                    &body_a.shape, body_a.position, &body_a.rotation,
                    &body_b.shape, body_b.position, &body_b.rotation,
                )
            };
            let Some(hit) = hit else { continue };

            if response == PairResponse::Contact {
                self.resolve(a, b, &hit);
            }
            contacts.push(ContactManifold {
                a,
                b,
                point: hit.point,
                normal: hit.normal,
                depth: hit.depth,
                response,
            });
        }
        self.contacts = contacts;
    }

    fn contacts(&self) -> &[ContactManifold] {
        &self.contacts
    }

    fn raycast(&self, ray: &Ray, max_distance: f32, filter: &dyn BroadphaseFilter) -> Option<BackendRayHit> {
        self.bodies
            .iter()
            .filter(|(handle, _)| filter.accepts_ray(*handle))
            .filter_map(|(handle, body)| {
                let (distance, normal) = ray_vs_shape(ray, &body.shape, body.position, &body.rotation)?;
                (distance <= max_distance).then(|| BackendRayHit {
                    body: handle,
                    distance,
                    point: ray.point_at(distance),
                    normal,
                })
            })
            .min_by(|l, r| l.distance.total_cmp(&r.distance))
    }

    fn query_overlaps(&self, shape: &CollisionShape, position: Vec3, rotation: Quat) -> Vec<BodyHandle> {
        let bounds = shape.world_aabb(position, &rotation);
        self.bodies
            .iter()
            .filter(|(_, body)| body.shape.world_aabb(body.position, &body.rotation).intersects(&bounds))
            .filter(|(_, body)| {
                collide(shape, position, &rotation, &body.shape, body.position, &body.rotation).is_some()
            })
            .map(|(handle, _)| handle)
            .collect()
    }

    fn add_constraint(&mut self, a: BodyHandle, b: BodyHandle, desc: ConstraintDesc) -> Option<ConstraintHandle> {
        let (body_a, body_b) = (self.bodies.get(a)?, self.bodies.get(b)?);
        let axis = match desc {
            ConstraintDesc::Weld | ConstraintDesc::Rope { .. } => Vec3::y(),
            ConstraintDesc::Hinge { axis } => axis.try_normalize(f32::EPSILON)?,
            ConstraintDesc::Slider { axis, min, max } => {
                if min > max {
                    return None;
                }
                axis.try_normalize(f32::EPSILON)?
            }
        };
        let inverse = body_a.rotation.inverse();
        let constraint = SimConstraint {
            a,
            b,
            desc,
            local_offset: inverse * (body_b.position - body_a.position),
            relative_rotation: inverse * body_b.rotation,
            axis_a: inverse * axis,
            axis_b: body_b.rotation.inverse() * axis,
        };
        Some(self.constraints.insert(constraint))
    }

    fn remove_constraint(&mut self, constraint: ConstraintHandle) -> bool {
        self.constraints.remove(constraint).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::backend::AcceptAll;
    use approx::assert_relative_eq;

    fn body(shape: CollisionShape, motion: Motion, position: Vec3) -> BodyDesc {
        BodyDesc {
            shape: Arc::new(shape),
            motion,
            mass: 1.0,
            position,
            rotation: Quat::identity(),
            friction: 0.5,
            restitution: 0.0,
            contact_response: true,
        }
    }

    #[test]
    fn test_free_fall_matches_semi_implicit_euler() {
        let mut backend = SimpleBackend::new();
        backend.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        let ball = backend.create_body(&body(CollisionShape::sphere(0.5).unwrap(), Motion::Dynamic, Vec3::zeros()));

        let dt = 0.02;
        for _ in 0..10 {
            backend.step(dt, &AcceptAll);
        }

        let (position, _) = backend.transform(ball).unwrap();
        // y_n = -g dt^2 n(n+1)/2
        assert_relative_eq!(position.y, -10.0 * dt * dt * 55.0, epsilon = 1e-4);
        assert_relative_eq!(backend.linear_velocity(ball).y, -2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_sphere_rests_on_plane() {
        let mut backend = SimpleBackend::new();
        backend.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        backend.create_body(&body(CollisionShape::plane(Vec3::y(), 0.0).unwrap(), Motion::Static, Vec3::zeros()));
        let ball = backend.create_body(&body(
            CollisionShape::sphere(0.5).unwrap(),
            Motion::Dynamic,
            Vec3::new(0.0, 2.0, 0.0),
        ));

        for _ in 0..200 {
            backend.step(0.02, &AcceptAll);
        }

        let (position, _) = backend.transform(ball).unwrap();
        assert_relative_eq!(position.y, 0.5, epsilon = 0.05);
        assert!(!backend.contacts().is_empty());
    }

    #[test]
    fn test_raycast_returns_nearest_body() {
        let mut backend = SimpleBackend::new();
        let near = backend.create_body(&body(CollisionShape::sphere(1.0).unwrap(), Motion::Static, Vec3::new(0.0, 0.0, -5.0)));
        backend.create_body(&body(
            CollisionShape::cuboid(Vec3::repeat(2.0)).unwrap(),
            Motion::Static,
            Vec3::new(0.0, 0.0, -10.0),
        ));

        let hit = backend
            .raycast(&Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)), 100.0, &AcceptAll)
            .unwrap();

        assert_eq!(hit.body, near);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-4);
        assert!(backend
            .raycast(&Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)), 3.0, &AcceptAll)
            .is_none());
    }

    #[test]
    fn test_rope_limits_distance() {
        let mut backend = SimpleBackend::new();
        backend.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        let anchor = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Static, Vec3::new(0.0, 10.0, 0.0)));
        let ball = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::new(0.0, 9.0, 0.0)));
        backend.add_constraint(anchor, ball, ConstraintDesc::Rope { max_length: 2.0 }).unwrap();

        for _ in 0..100 {
            backend.step(0.02, &AcceptAll);
        }

        let (position, _) = backend.transform(ball).unwrap();
        assert!((position - Vec3::new(0.0, 10.0, 0.0)).magnitude() <= 2.0 + 1e-3);
    }

    #[test]
    fn test_destroying_body_drops_its_constraints() {
        let mut backend = SimpleBackend::new();
        let a = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::zeros()));
        let b = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::x()));
        backend.add_constraint(a, b, ConstraintDesc::Weld).unwrap();

        assert!(backend.destroy_body(a));
        assert_eq!(backend.constraint_count(), 0);
        assert!(!backend.destroy_body(a));
    }

    #[test]
    fn test_hinge_only_spins_about_its_axis() {
        let mut backend = SimpleBackend::new();
        let anchor = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Static, Vec3::zeros()));
        let wheel = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::x()));
        backend.add_constraint(anchor, wheel, ConstraintDesc::Hinge { axis: Vec3::z() }).unwrap();
        backend.set_angular_velocity(wheel, Vec3::new(1.0, 0.0, 2.0));
        backend.set_linear_velocity(wheel, Vec3::new(0.0, 3.0, 0.0));

        for _ in 0..50 {
            backend.step(0.02, &AcceptAll);
        }

        let (position, rotation) = backend.transform(wheel).unwrap();
        assert_relative_eq!(position, Vec3::x(), epsilon = 1e-4);
        assert_relative_eq!(backend.angular_velocity(wheel), Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-4);
        assert_relative_eq!((rotation * Vec3::z()).dot(&Vec3::z()), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_slider_moves_along_axis_within_limits() {
        let mut backend = SimpleBackend::new();
        let rail = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Static, Vec3::zeros()));
        let carriage = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::x()));
        backend
            .add_constraint(rail, carriage, ConstraintDesc::Slider { axis: Vec3::x(), min: -0.5, max: 0.5 })
            .unwrap();
        backend.set_linear_velocity(carriage, Vec3::new(3.0, 2.0, 0.0));
        backend.set_angular_velocity(carriage, Vec3::new(0.0, 1.0, 0.0));

        for _ in 0..50 {
            backend.step(0.02, &AcceptAll);
        }

        let (position, rotation) = backend.transform(carriage).unwrap();
        assert_relative_eq!(position, Vec3::new(1.5, 0.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(rotation.angle(), 0.0, epsilon = 1e-4);
        assert_relative_eq!(backend.linear_velocity(carriage).x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_degenerate_joint_descriptions_are_rejected() {
        let mut backend = SimpleBackend::new();
        let a = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::zeros()));
        let b = backend.create_body(&body(CollisionShape::sphere(0.1).unwrap(), Motion::Dynamic, Vec3::x()));

        assert!(backend.add_constraint(a, b, ConstraintDesc::Hinge { axis: Vec3::zeros() }).is_none());
        assert!(backend
            .add_constraint(a, b, ConstraintDesc::Slider { axis: Vec3::x(), min: 1.0, max: -1.0 })
            .is_none());
        assert_eq!(backend.constraint_count(), 0);
    }
}
