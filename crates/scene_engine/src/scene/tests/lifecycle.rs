use super::{count, cube, scene, Counter};
use crate::foundation::reference::ReferenceError;
use crate::scene::{Behaviour, ObjectRef, ObjectState, Scene, SceneError, SceneHooks, UpdateContext};
use std::sync::{Arc, Mutex};

/// Removes `target` on its first update
struct Remover {
    target: ObjectRef,
}

impl Behaviour for Remover {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, _dt: f32) {
        if ctx.scene.is_alive(self.target) {
            ctx.scene.remove_object(self.target).unwrap();
        }
    }
}

/// Adds a counter to its own object once
struct Spawner {
    counter: Option<Counter>,
}

impl Behaviour for Spawner {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, _dt: f32) {
        if let Some(counter) = self.counter.take() {
            ctx.scene.add_behaviour(ctx.object, counter).unwrap();
        }
    }
}

#[derive(Clone, Default)]
struct PhaseLog(Arc<Mutex<Vec<&'static str>>>);

impl PhaseLog {
    fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    fn push(&self, phase: &'static str) {
        self.0.lock().unwrap().push(phase);
    }
}

impl SceneHooks for PhaseLog {
    fn pre_update(&mut self, _scene: &mut Scene, _dt: f32) {
        self.push("pre_update");
    }

    fn post_update(&mut self, _scene: &mut Scene, _dt: f32) {
        self.push("post_update");
    }

    fn fixed_update(&mut self, _scene: &mut Scene, _dt: f32) {
        self.push("fixed_update");
    }

    fn pre_draw(&mut self, _scene: &Scene) {
        self.push("pre_draw");
    }

    fn post_draw(&mut self, _scene: &Scene) {
        self.push("post_draw");
    }
}

#[test]
fn test_handles_expire_with_their_subtree() {
    let mut scene = scene();
    let a = scene.create_object("a").unwrap();
    let b = scene.create_child(a, "b").unwrap();
    let drawable = scene.create_drawable(b, cube()).unwrap();

    scene.remove_object(a).unwrap();

    assert!(!scene.is_alive(a));
    assert_eq!(scene.state(b), ObjectState::Destroyed);
    assert!(!scene.component_alive(drawable));
    assert!(matches!(
        scene.object(b),
        Err(SceneError::Reference(ReferenceError::Expired(_)))
    ));
    assert!(scene.renderer().bound_drawables().is_empty());
}

#[test]
fn test_handle_from_another_scene_is_rejected() {
    let mut first = scene();
    let mut second = scene();
    let object = first.create_object("a").unwrap();
    second.create_object("a").unwrap();

    assert!(matches!(
        second.object(object),
        Err(SceneError::Reference(ReferenceError::WrongScene(_)))
    ));
}

#[test]
fn test_root_cannot_be_removed() {
    let mut scene = scene();
    let root = scene.root();

    assert!(matches!(scene.remove_object(root), Err(SceneError::RootObject)));
}

#[test]
fn test_renderer_tracks_live_drawables() {
    let mut scene = scene();
    let drawables: Vec<_> = (0..10)
        .map(|i| {
            let object = scene.create_object(&format!("d{}", i)).unwrap();
            (object, scene.create_drawable(object, cube()).unwrap())
        })
        .collect();

    for (object, _) in &drawables[..2] {
        scene.remove_object(*object).unwrap();
    }
    for (_, drawable) in &drawables[2..4] {
        scene.remove_component(*drawable).unwrap();
    }

    assert_eq!(scene.renderer().bound_drawables().len(), 6);
    assert!(drawables[4..].iter().all(|(_, d)| scene.renderer().bound_drawables().contains(d)));
}

#[test]
fn test_removal_during_update_is_deferred() {
    let mut scene = scene();
    let killer = scene.create_object("killer").unwrap();
    let victim = scene.create_object("victim").unwrap();
    let (counter, updates) = Counter::new();
    scene.add_behaviour(victim, counter).unwrap();
    scene.add_behaviour(killer, Remover { target: victim }).unwrap();

    scene.update(0.016);

    assert_eq!(scene.state(victim), ObjectState::PendingRemoval);
    assert!(scene.is_alive(victim));
    assert_eq!(count(&updates), 0);
    assert_eq!(scene.find_child(scene.root(), "victim", false), None);

    scene.update(0.016);

    assert_eq!(scene.state(victim), ObjectState::Destroyed);
}

#[test]
fn test_pending_subtree_cannot_be_reparented() {
    let mut scene = scene();
    let killer = scene.create_object("killer").unwrap();
    let parent = scene.create_object("parent").unwrap();
    let child = scene.create_child(parent, "child").unwrap();
    let bystander = scene.create_object("bystander").unwrap();
    scene.add_behaviour(killer, Remover { target: parent }).unwrap();

    scene.update(0.016);

    assert_eq!(scene.state(child), ObjectState::PendingRemoval);
    assert!(matches!(scene.reparent(child, scene.root()), Err(SceneError::PendingRemoval)));
    assert!(matches!(scene.reparent(bystander, parent), Err(SceneError::PendingRemoval)));

    scene.update(0.016);

    assert_eq!(scene.state(parent), ObjectState::Destroyed);
    assert_eq!(scene.state(child), ObjectState::Destroyed);
    assert_eq!(scene.state(bystander), ObjectState::Active);
}

#[test]
fn test_self_removal_stops_remaining_components() {
    let mut scene = scene();
    let object = scene.create_object("doomed").unwrap();
    scene.add_behaviour(object, Remover { target: object }).unwrap();
    let (counter, updates) = Counter::new();
    scene.add_behaviour(object, counter).unwrap();

    scene.update(0.016);

    assert_eq!(count(&updates), 0);
    assert_eq!(scene.state(object), ObjectState::PendingRemoval);
    assert!(matches!(scene.create_child(object, "late"), Err(SceneError::PendingRemoval)));
}

#[test]
fn test_component_added_during_update_runs_same_frame() {
    let mut scene = scene();
    let object = scene.create_object("spawner").unwrap();
    let (counter, updates) = Counter::new();
    scene.add_behaviour(object, Spawner { counter: Some(counter) }).unwrap();

    scene.update(0.016);
    assert_eq!(count(&updates), 1);

    scene.update(0.016);
    assert_eq!(count(&updates), 2);
}

#[test]
fn test_inactive_subtree_skips_behaviours() {
    let mut scene = scene();
    let parent = scene.create_object("parent").unwrap();
    let child = scene.create_child(parent, "child").unwrap();
    let (counter, updates) = Counter::new();
    scene.add_behaviour(child, counter).unwrap();

    scene.set_active(parent, false).unwrap();
    scene.update(0.016);
    assert_eq!(count(&updates), 0);
    assert_eq!(scene.state(child), ObjectState::Inactive);

    scene.set_active(parent, true).unwrap();
    scene.update(0.016);
    assert_eq!(count(&updates), 1);
}

#[test]
fn test_inactive_component_is_skipped() {
    let mut scene = scene();
    let object = scene.create_object("a").unwrap();
    let (counter, updates) = Counter::new();
    let behaviour = scene.add_behaviour(object, counter).unwrap();

    scene.set_component_active(behaviour, false).unwrap();
    scene.update(0.016);

    assert_eq!(count(&updates), 0);
}

#[test]
fn test_inactive_scene_does_not_advance() {
    let mut scene = scene();
    scene.set_scene_active(false);

    scene.update(0.016);

    assert_eq!(scene.frame(), 0);
}

#[test]
fn test_hook_order() {
    let mut scene = scene();
    let log = PhaseLog::default();
    scene.set_hooks(Box::new(log.clone()));

    // Two 50 Hz ticks
    scene.update(0.04);
    assert_eq!(log.take(), vec!["pre_update", "fixed_update", "fixed_update", "post_update"]);

    scene.update(0.005);
    assert_eq!(log.take(), vec!["pre_update", "post_update"]);

    scene.draw(&mut crate::render::RecordingBackend::new());
    assert_eq!(log.take(), vec!["pre_draw", "post_draw"]);
    assert_eq!(scene.frame(), 2);
}

#[test]
fn test_delta_scale_stretches_time() {
    let mut scene = scene();
    let log = PhaseLog::default();
    scene.set_hooks(Box::new(log.clone()));
    scene.set_delta_scale(2.0);

    scene.update(0.02);

    assert_eq!(log.take(), vec!["pre_update", "fixed_update", "fixed_update", "post_update"]);
}

#[test]
fn test_remove_children_by_name() {
    let mut scene = scene();
    let parent = scene.create_object("parent").unwrap();
    scene.create_child(parent, "bullet").unwrap();
    scene.create_child(parent, "shell").unwrap();

    assert_eq!(scene.remove_children(parent, "bullet").unwrap(), 1);
    assert_eq!(scene.remove_children(parent, "bullet").unwrap(), 0);
    assert_eq!(scene.object(parent).unwrap().child_count(), 1);
}
