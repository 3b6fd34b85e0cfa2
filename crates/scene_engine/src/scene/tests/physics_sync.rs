use super::{quiet_config, scene};
use crate::foundation::math::Vec3;
use crate::foundation::reference::SafeReferenceable;
use crate::physics::{
    BodyType, CollisionShape, ContactInfo, ContactListener, JointKind, PhantomBody, PhantomType, PhysicsError,
    RigidBodyInfo,
};
use crate::scene::{ComponentRef, ObjectRef, Scene, SceneError};
use approx::assert_relative_eq;
use std::sync::Arc;

#[derive(Default)]
struct ContactLog {
    events: Vec<(&'static str, ComponentRef, ComponentRef)>,
}

impl ContactListener for ContactLog {
    fn begin_contact(&mut self, collider: ComponentRef, other: ComponentRef, _info: &ContactInfo) {
        self.events.push(("begin_contact", collider, other));
    }

    fn end_contact(&mut self, collider: ComponentRef, other: ComponentRef) {
        self.events.push(("end_contact", collider, other));
    }

    fn begin_overlap(&mut self, collider: ComponentRef, other: ComponentRef) {
        self.events.push(("begin_overlap", collider, other));
    }

    fn end_overlap(&mut self, collider: ComponentRef, other: ComponentRef) {
        self.events.push(("end_overlap", collider, other));
    }
}

fn ball(body_type: BodyType) -> RigidBodyInfo {
    RigidBodyInfo::new(body_type, Arc::new(CollisionShape::sphere(0.5).unwrap()), 1.0)
}

fn body_at(scene: &mut Scene, name: &str, position: Vec3, body_type: BodyType) -> (ObjectRef, ComponentRef) {
    let object = scene.create_object(name).unwrap();
    scene.object_mut(object).unwrap().set_position(position);
    let body = scene.create_rigid_body(object, ball(body_type)).unwrap();
    (object, body)
}

#[test]
fn test_free_fall_follows_fixed_steps() {
    let mut config = quiet_config();
    config.physics.gravity = [0.0, -10.0, 0.0];
    let mut scene = Scene::new("fall", &config);
    let (object, body) = body_at(&mut scene, "ball", Vec3::zeros(), BodyType::Dynamic);
    let dt = 0.02_f32;

    for n in 1..=10u16 {
        scene.update(dt);
        let n = f32::from(n);
        let expected = -10.0 * dt * dt * n * (n + 1.0) / 2.0;
        assert_relative_eq!(scene.global_position(object).unwrap().y, expected, epsilon = 1e-4);
    }
    assert_relative_eq!(scene.rigid_body_mut(body).unwrap().linear_velocity().y, -2.0, epsilon = 1e-4);
}

#[test]
fn test_kinematic_body_follows_its_object() {
    let mut scene = scene();
    let parent = scene.create_object("parent").unwrap();
    scene.object_mut(parent).unwrap().set_position(Vec3::new(2.0, 0.0, 0.0));
    let object = scene.create_child(parent, "platform").unwrap();
    let body = scene.create_rigid_body(object, ball(BodyType::Kinematic)).unwrap();

    scene.object_mut(object).unwrap().set_position(Vec3::new(0.0, 3.0, 0.0));
    scene.update(0.02);

    assert_relative_eq!(scene.rigid_body_mut(body).unwrap().position(), Vec3::new(2.0, 3.0, 0.0));
}

#[test]
fn test_dynamic_body_detaches_from_parent() {
    let mut scene = scene();
    let parent = scene.create_object("parent").unwrap();
    scene.object_mut(parent).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
    let object = scene.create_child(parent, "crate").unwrap();
    scene.object_mut(object).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));

    scene.create_rigid_body(object, ball(BodyType::Dynamic)).unwrap();
    scene.object_mut(parent).unwrap().set_position(Vec3::new(-5.0, 0.0, 0.0));
    scene.update(0.02);

    assert!(scene.object(object).unwrap().ignores_parent());
    assert_relative_eq!(scene.global_position(object).unwrap(), Vec3::new(6.0, 0.0, 0.0));
}

#[test]
fn test_static_body_stays_where_created() {
    let mut scene = scene();
    let (object, body) = body_at(&mut scene, "wall", Vec3::zeros(), BodyType::Static);

    scene.object_mut(object).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
    scene.update(0.02);

    assert_relative_eq!(scene.rigid_body_mut(body).unwrap().position(), Vec3::zeros());
}

#[test]
fn test_contact_callbacks_are_symmetric() {
    let mut scene = scene();
    let (_, a) = body_at(&mut scene, "a", Vec3::zeros(), BodyType::Kinematic);
    let (b_object, b) = body_at(&mut scene, "b", Vec3::new(0.8, 0.0, 0.0), BodyType::Kinematic);
    let log_a = SafeReferenceable::new(ContactLog::default());
    let log_b = SafeReferenceable::new(ContactLog::default());
    scene.add_contact_listener(a, log_a.listener()).unwrap();
    scene.add_contact_listener(b, log_b.listener()).unwrap();

    scene.update(0.02);
    scene.update(0.02);

    assert_eq!(log_a.get().events, vec![("begin_contact", a, b)]);
    assert_eq!(log_b.get().events, vec![("begin_contact", b, a)]);

    // Destroying one side while touching still ends the contact on both
    scene.remove_object(b_object).unwrap();

    assert_eq!(log_a.get().events.last(), Some(&("end_contact", a, b)));
    assert_eq!(log_b.get().events.last(), Some(&("end_contact", b, a)));
    assert_eq!(scene.world().active_pair_count(), 0);
}

#[test]
fn test_dropping_scene_ends_contacts() {
    let mut scene = scene();
    let (_, a) = body_at(&mut scene, "a", Vec3::zeros(), BodyType::Kinematic);
    let (_, b) = body_at(&mut scene, "b", Vec3::new(0.8, 0.0, 0.0), BodyType::Kinematic);
    let log = SafeReferenceable::new(ContactLog::default());
    scene.add_contact_listener(a, log.listener()).unwrap();
    scene.update(0.02);

    drop(scene);

    assert_eq!(log.get().events, vec![("begin_contact", a, b), ("end_contact", a, b)]);
}

#[test]
fn test_phantom_reports_overlaps() {
    let mut scene = scene();
    let zone = scene.create_object("zone").unwrap();
    let phantom = PhantomBody::new(Arc::new(CollisionShape::sphere(2.0).unwrap()), PhantomType::Kinematic);
    let trigger = scene.create_phantom_body(zone, phantom).unwrap();
    let (_, visitor) = body_at(&mut scene, "visitor", Vec3::new(1.0, 0.0, 0.0), BodyType::Kinematic);
    let log = SafeReferenceable::new(ContactLog::default());
    scene.add_contact_listener(trigger, log.listener()).unwrap();

    scene.update(0.02);

    assert_eq!(log.get().events, vec![("begin_overlap", trigger, visitor)]);
}

#[test]
fn test_raycast_reports_owner() {
    let mut scene = scene();
    let (object, body) = body_at(&mut scene, "target", Vec3::new(0.0, 0.0, -5.0), BodyType::Static);

    let hit = scene.raycast(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), 100.0).unwrap();

    assert_eq!(hit.object, object);
    assert_eq!(hit.collider, body);
    assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-3);
    assert!(scene.raycast(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), 100.0).is_none());
}

#[test]
fn test_one_body_per_object() {
    let mut scene = scene();
    let (object, _) = body_at(&mut scene, "a", Vec3::zeros(), BodyType::Dynamic);
    let phantom = PhantomBody::new(Arc::new(CollisionShape::sphere(1.0).unwrap()), PhantomType::Static);

    assert!(matches!(
        scene.create_rigid_body(object, ball(BodyType::Static)),
        Err(SceneError::BodyAlreadyAttached)
    ));
    assert!(matches!(scene.create_phantom_body(object, phantom), Err(SceneError::BodyAlreadyAttached)));
}

#[test]
fn test_joints_live_and_die_with_their_bodies() {
    let mut scene = scene();
    let (a_object, a) = body_at(&mut scene, "a", Vec3::zeros(), BodyType::Dynamic);
    let (_, b) = body_at(&mut scene, "b", Vec3::new(2.0, 0.0, 0.0), BodyType::Dynamic);

    let joint = scene.create_joint(a, b, JointKind::Weld, false).unwrap();
    assert_eq!(scene.joint_bodies(joint), Some((a, b)));
    assert_relative_eq!(scene.joint_center(joint).unwrap(), Vec3::new(1.0, 0.0, 0.0));

    scene.remove_object(a_object).unwrap();

    assert!(scene.joint(joint).is_none());
    assert!(!scene.remove_joint(joint));
}

#[test]
fn test_joint_across_scenes_is_rejected() {
    let mut first = scene();
    let mut second = scene();
    let (_, a) = body_at(&mut first, "a", Vec3::zeros(), BodyType::Dynamic);
    let (_, b) = body_at(&mut second, "b", Vec3::zeros(), BodyType::Dynamic);

    assert!(matches!(
        first.create_joint(a, b, JointKind::Weld, false),
        Err(SceneError::Physics(PhysicsError::WorldMismatch))
    ));
    assert_eq!(first.world().joint_count(), 0);
}

#[test]
fn test_joint_requires_rigid_bodies() {
    let mut scene = scene();
    let (_, a) = body_at(&mut scene, "a", Vec3::zeros(), BodyType::Dynamic);
    let other = scene.create_object("plain").unwrap();
    let drawable = scene.create_drawable(other, super::cube()).unwrap();

    assert!(matches!(
        scene.create_joint(a, drawable, JointKind::Weld, false),
        Err(SceneError::Physics(PhysicsError::NotARigidBody))
    ));
}
