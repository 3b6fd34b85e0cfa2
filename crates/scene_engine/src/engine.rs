//! Core engine implementation

use crate::application::Application;
use crate::assets::{AsyncLoader, FileLoader, FsLoader, LoadTicket};
use crate::config::{ConfigError, EngineConfig};
use crate::foundation::{logging, time::Timer};
use crate::render::{DrawStats, GraphicsBackend};
use crate::scene::{Scene, SceneError};
use std::sync::Arc;
use thiserror::Error;

/// Main engine struct
///
/// Owns the scene, the graphics backend and the background asset loader,
/// and runs the frame loop: hand out finished loads, update the
/// application, update the scene, draw.
pub struct Engine {
    /// The scene being simulated and drawn
    pub scene: Scene,

    /// Background file loading
    loader: AsyncLoader,

    /// Where draw calls go
    backend: Box<dyn GraphicsBackend>,

    /// Frame timing
    timer: Timer,

    config: EngineConfig,

    /// Fixed frame time for deterministic runs
    fixed_delta: Option<f32>,

    /// Stop after this many frames
    frame_limit: Option<u64>,

    last_stats: DrawStats,

    /// Whether the engine should continue running
    running: bool,
}

impl Engine {
    /// Create an engine reading files through the configured search paths
    pub fn new(config: EngineConfig, backend: Box<dyn GraphicsBackend>) -> Result<Self, EngineError> {
        let loader = Arc::new(FsLoader::from_config(&config.assets));
        Self::with_loader(config, backend, loader)
    }

    /// Create an engine with a caller-supplied file loader
    pub fn with_loader(
        config: EngineConfig,
        backend: Box<dyn GraphicsBackend>,
        file_loader: Arc<dyn FileLoader>,
    ) -> Result<Self, EngineError> {
        logging::init_with_default(&config.logging.default_filter);
        log::info!("Initializing engine...");

        if config.physics.update_frequency == 0 {
            return Err(EngineError::InitializationFailed(
                "physics update frequency must be positive".to_string(),
            ));
        }

        let scene = Scene::new(&config.window.title, &config);
        let loader = AsyncLoader::new(file_loader, config.assets.worker_threads);

        Ok(Self {
            scene,
            loader,
            backend,
            timer: Timer::new(),
            config,
            fixed_delta: None,
            frame_limit: None,
            last_stats: DrawStats::default(),
            running: true,
        })
    }

    /// Create an engine and run `app` until it quits
    pub fn run<T: Application>(
        config: EngineConfig,
        backend: Box<dyn GraphicsBackend>,
        app: &mut T,
    ) -> Result<(), EngineError> {
        let mut engine = Self::new(config, backend)?;
        engine.run_app(app)
    }

    /// Run `app` on this engine until it quits or the frame limit is hit
    pub fn run_app<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        log::info!("Starting main loop...");
        self.running = true;

        let result = loop {
            if !self.running || self.frame_limit.is_some_and(|limit| self.timer.frame_count() >= limit) {
                break Ok(());
            }
            if let Err(err) = self.frame(app) {
                break Err(err);
            }
        };

        app.cleanup(self);
        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
        result
    }

    /// Run a single frame
    pub fn frame<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        match self.fixed_delta {
            Some(dt) => self.timer.advance(dt),
            None => self.timer.update(),
        }
        let delta_time = self.timer.delta_time();

        for completion in self.loader.poll() {
            if !completion.success {
                log::warn!("Failed to load {}", completion.path);
            }
            app.asset_loaded(self, completion)
                .map_err(|e| EngineError::ApplicationError(format!("Asset hand-off: {}", e)))?;
        }

        app.update(self, delta_time)
            .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;

        self.scene.update(delta_time);

        app.render(self)
            .map_err(|e| EngineError::ApplicationError(format!("App render: {}", e)))?;
        Ok(())
    }

    /// Draw the scene through the graphics backend
    pub fn render(&mut self) -> DrawStats {
        self.last_stats = self.scene.draw(self.backend.as_mut());
        self.last_stats
    }

    /// Statistics of the most recent draw
    pub fn last_draw_stats(&self) -> DrawStats {
        self.last_stats
    }

    /// Queue a file for background loading
    pub fn load_async(&mut self, path: &str) -> Result<LoadTicket, EngineError> {
        self.loader.request(path).map_err(|e| EngineError::AssetError(e.to_string()))
    }

    /// Loads queued but not handed out yet
    pub fn pending_loads(&self) -> usize {
        self.loader.in_flight()
    }

    /// Use a fixed frame time instead of the wall clock
    pub fn set_fixed_delta(&mut self, delta_time: Option<f32>) {
        self.fixed_delta = delta_time;
    }

    /// Stop `run_app` after `frames` frames
    pub fn set_frame_limit(&mut self, frames: Option<u64>) {
        self.frame_limit = frames;
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the main loop keeps running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Settings the engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Graphics backend used by [`Engine::render`]
    pub fn backend(&self) -> &dyn GraphicsBackend {
        self.backend.as_ref()
    }

    /// Mutable graphics backend
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Scene operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset system error
    #[error("Asset system error: {0}")]
    AssetError(String),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::assets::{LoadCompletion, MemoryLoader};
    use crate::render::{Camera, Drawable, Mesh, RecordingBackend, Viewport, BufferId};
    use crate::foundation::math::Vec3;

    #[derive(Default)]
    struct Probe {
        frames: u32,
        loaded: Vec<(String, bool, usize)>,
        cleaned_up: bool,
    }

    impl Application for Probe {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            let camera = engine.scene.create_object("camera")?;
            let config = engine.config().camera.clone();
            engine.scene.create_camera(camera, Camera::perspective(&config, Viewport::full(64, 64)))?;
            let cube = engine.scene.create_object("cube")?;
            engine.scene.object_mut(cube)?.set_position(Vec3::new(0.0, 0.0, -5.0));
            let mesh = Mesh::cuboid(BufferId(7), Vec3::new(1.0, 1.0, 1.0));
            engine.scene.create_drawable(cube, Drawable::new(Arc::new(mesh)))?;

            engine.load_async("level.txt")?;
            engine.load_async("missing.txt")?;
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            self.frames += 1;
            if self.frames == 3 {
                engine.quit();
            }
            Ok(())
        }

        fn asset_loaded(&mut self, _engine: &mut Engine, completion: LoadCompletion) -> Result<(), AppError> {
            self.loaded.push((completion.path, completion.success, completion.data.len()));
            Ok(())
        }

        fn cleanup(&mut self, _engine: &mut Engine) {
            self.cleaned_up = true;
        }
    }

    fn engine() -> Engine {
        let loader = Arc::new(MemoryLoader::new().with_file("level.txt", "data"));
        let mut engine =
            Engine::with_loader(EngineConfig::default(), Box::new(RecordingBackend::new()), loader).unwrap();
        engine.set_fixed_delta(Some(0.02));
        engine
    }

    #[test]
    fn test_loop_runs_until_quit() {
        let mut engine = engine();
        let mut app = Probe::default();

        engine.run_app(&mut app).unwrap();

        assert_eq!(app.frames, 3);
        assert!(app.cleaned_up);
        assert_eq!(engine.scene.frame(), 3);
        assert_eq!(engine.last_draw_stats().draws, 1);
    }

    #[test]
    fn test_frame_limit_stops_loop() {
        let mut engine = engine();
        engine.set_frame_limit(Some(2));
        let mut app = Probe::default();

        engine.run_app(&mut app).unwrap();

        assert_eq!(app.frames, 2);
        assert_eq!(engine.frame_count(), 2);
    }

    #[test]
    fn test_loads_are_handed_out_between_frames() {
        let mut engine = engine();
        let mut app = Probe::default();
        app.initialize(&mut engine).unwrap();
        assert_eq!(engine.pending_loads(), 2);

        for _ in 0..500 {
            if app.loaded.len() == 2 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
            engine.frame(&mut app).unwrap();
        }

        app.loaded.sort();
        assert_eq!(
            app.loaded,
            vec![("level.txt".to_string(), true, 4), ("missing.txt".to_string(), false, 0)]
        );
        assert_eq!(engine.pending_loads(), 0);
    }

    #[test]
    fn test_zero_physics_frequency_is_rejected() {
        let mut config = EngineConfig::default();
        config.physics.update_frequency = 0;

        let result = Engine::new(config, Box::new(RecordingBackend::new()));

        assert!(matches!(result, Err(EngineError::InitializationFailed(_))));
    }
}
