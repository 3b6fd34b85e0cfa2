//! Scene tests spanning the object tree, the renderer and the physics world

mod lifecycle;
mod physics_sync;
mod rendering;

use crate::config::EngineConfig;
use crate::foundation::math::Vec3;
use crate::render::{BufferId, Drawable, Mesh};
use crate::scene::{Behaviour, Scene, UpdateContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn quiet_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.physics.gravity = [0.0; 3];
    config
}

fn scene() -> Scene {
    Scene::new("test", &quiet_config())
}

fn cube() -> Drawable {
    Drawable::new(Arc::new(Mesh::cuboid(BufferId(1), Vec3::new(1.0, 1.0, 1.0))))
}

/// Counts `update` calls
#[derive(Clone)]
struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (Self(Arc::clone(&count)), count)
    }
}

impl Behaviour for Counter {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>, _dt: f32) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn clone_boxed(&self) -> Option<Box<dyn Behaviour>> {
        Some(Box::new(self.clone()))
    }
}

fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
