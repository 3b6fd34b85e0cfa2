//! Headless demo
//!
//! Builds a small scene (a spinning lit box and a wrecking ball swinging into
//! a stack of crates), runs it for a fixed number of frames through the
//! recording graphics backend and logs what happened.
//!
//! Usage: `demo_app [frames] [config.toml|config.ron]`

use scene_engine::prelude::*;
use scene_engine::render::BufferId;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
enum DemoError {
    #[error("invalid frame count: {0}")]
    FrameCount(String),

    #[error(transparent)]
    Config(#[from] scene_engine::config::ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Spins its object around the vertical axis
#[derive(Clone)]
struct Spinner {
    speed: f32,
}

impl Behaviour for Spinner {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        if let Ok(mut object) = ctx.scene.object_mut(ctx.object) {
            object.rotate_axis(Vec3::y(), self.speed * dt);
        }
    }

    fn clone_boxed(&self) -> Option<Box<dyn Behaviour>> {
        Some(Box::new(self.clone()))
    }
}

/// Counts how often the ball hits something
#[derive(Default)]
struct HitCounter {
    hits: u32,
}

impl ContactListener for HitCounter {
    fn begin_contact(&mut self, _collider: ComponentRef, _other: ComponentRef, info: &ContactInfo) {
        self.hits += 1;
        log::debug!("Ball hit at {:?}", info.point);
    }
}

struct Demo {
    hits: SafeReferenceable<HitCounter>,
    ball: Option<ObjectRef>,
    draws: usize,
}

impl Demo {
    fn new() -> Self {
        Self {
            hits: SafeReferenceable::new(HitCounter::default()),
            ball: None,
            draws: 0,
        }
    }

    fn shape(shape: Result<CollisionShape, scene_engine::physics::ShapeError>) -> Result<Arc<CollisionShape>, AppError> {
        shape.map(Arc::new).map_err(|e| AppError::Custom(e.to_string()))
    }

    fn build_showcase(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let scene = &mut engine.scene;
        let mesh = Arc::new(Mesh::cuboid(BufferId(1), Vec3::new(1.0, 1.0, 1.0)));

        let spinner = scene.create_object("spinner")?;
        scene.object_mut(spinner)?.set_position(Vec3::new(-4.0, 1.0, -6.0));
        scene.create_drawable(spinner, Drawable::new(Arc::clone(&mesh)))?;
        scene.add_behaviour(spinner, Spinner { speed: 1.5 })?;

        let lamp = scene.create_object("lamp")?;
        scene.object_mut(lamp)?.set_position(Vec3::new(-4.0, 3.0, -4.0));
        let mut light = LightSource::new(LightType::Point);
        light.set_range(20.0).set_all_intensities(Color::WHITE);
        scene.create_light(lamp, light)?;

        let sun = scene.create_object("sun")?;
        scene.object_mut(sun)?.look_at(Vec3::new(0.0, -1.0, -1.0), Vec3::y());
        scene.create_light(sun, LightSource::new(LightType::Directional))?;

        let probe = scene.create_object("probe")?;
        scene.object_mut(probe)?.set_position(Vec3::new(0.0, 2.0, -6.0));
        scene.create_environment_recorder(probe, EnvironmentRecorder::new(64, 15.0))?;
        Ok(())
    }

    fn build_wrecking_ball(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let scene = &mut engine.scene;
        let crate_mesh = Arc::new(Mesh::cuboid(BufferId(2), Vec3::new(1.0, 1.0, 1.0)));

        let floor = scene.create_object("floor")?;
        let plane = Self::shape(CollisionShape::plane(Vec3::y(), 0.0))?;
        scene.create_rigid_body(floor, RigidBodyInfo::new(BodyType::Static, plane, 0.0))?;

        let crate_shape = Self::shape(CollisionShape::cuboid(Vec3::new(1.0, 1.0, 1.0)))?;
        let stack = scene.create_object("stack")?;
        scene.object_mut(stack)?.add_tag("crates");
        for level in 0..4u8 {
            let name = format!("crate{}", level);
            let item = scene.create_child(stack, &name)?;
            scene.object_mut(item)?.set_position(Vec3::new(3.0, 0.5 + f32::from(level), -6.0));
            scene.create_drawable(item, Drawable::new(Arc::clone(&crate_mesh)))?;
            let info = RigidBodyInfo::new(BodyType::Dynamic, Arc::clone(&crate_shape), 1.0).with_friction(0.6);
            scene.create_rigid_body(item, info)?;
        }

        let anchor = scene.create_object("anchor")?;
        scene.object_mut(anchor)?.set_position(Vec3::new(3.0, 8.0, -6.0));
        let anchor_shape = Self::shape(CollisionShape::sphere(0.1))?;
        let anchor_body =
            scene.create_rigid_body(anchor, RigidBodyInfo::new(BodyType::Kinematic, anchor_shape, 0.0))?;

        let ball = scene.create_object("ball")?;
        scene.object_mut(ball)?.set_position(Vec3::new(-3.0, 6.0, -6.0));
        let ball_shape = Self::shape(CollisionShape::sphere(0.75))?;
        let ball_body = scene.create_rigid_body(ball, RigidBodyInfo::new(BodyType::Dynamic, ball_shape, 20.0))?;
        scene.create_drawable(ball, Drawable::new(Arc::new(Mesh::cuboid(BufferId(3), Vec3::new(1.5, 1.5, 1.5)))))?;
        scene.add_contact_listener(ball_body, self.hits.listener())?;
        scene.create_joint(anchor_body, ball_body, JointKind::Rope { max_length: 6.5 }, false)?;

        self.ball = Some(ball);
        Ok(())
    }
}

impl Application for Demo {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let camera_config = engine.config().camera.clone();
        let window = engine.config().window.clone();
        let camera = engine.scene.create_object("camera")?;
        engine
            .scene
            .object_mut(camera)?
            .set_position(Vec3::new(0.0, 4.0, 8.0))
            .look_at(Vec3::new(0.0, 1.0, -6.0), Vec3::y());
        let viewport = Viewport::full(window.width, window.height);
        engine.scene.create_camera(camera, Camera::perspective(&camera_config, viewport))?;

        self.build_showcase(engine)?;
        self.build_wrecking_ball(engine)?;
        log::debug!("Scene layout:\n{}", engine.scene.debug_tree());
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        if engine.frame_count() % 50 == 0 {
            if let Some(ball) = self.ball {
                let position = engine.scene.global_position(ball)?;
                log::info!("Frame {}: ball at ({:.2}, {:.2}, {:.2})", engine.frame_count(), position.x, position.y, position.z);
            }
        }
        Ok(())
    }

    fn render(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        self.draws += engine.render().draws;
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        let stack = engine.scene.find_children_with_tag(engine.scene.root(), "crates", false);
        let standing = stack
            .first()
            .map(|s| engine.scene.children(*s).unwrap_or_default())
            .unwrap_or_default()
            .into_iter()
            .filter(|c| engine.scene.global_position(*c).is_ok_and(|p| p.y > 3.0))
            .count();
        log::info!(
            "Ran {} frames: {} drawables drawn, {} ball hits, {} crates still high",
            engine.frame_count(),
            self.draws,
            self.hits.get().hits,
            standing
        );
    }
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let frames = match args.next() {
        Some(arg) => arg.parse::<u64>().map_err(|_| DemoError::FrameCount(arg))?,
        None => 300,
    };
    let config = match args.next() {
        Some(path) => EngineConfig::load_from_file(&path)?,
        None => EngineConfig::default(),
    };
    let fixed_delta = config.physics.fixed_timestep();

    let mut engine = Engine::new(config, Box::new(RecordingBackend::new()))?;
    engine.set_fixed_delta(Some(fixed_delta));
    engine.set_frame_limit(Some(frames));

    let mut demo = Demo::new();
    engine.run_app(&mut demo)?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("Demo failed: {}", err);
        eprintln!("demo_app: {}", err);
        std::process::exit(1);
    }
}
