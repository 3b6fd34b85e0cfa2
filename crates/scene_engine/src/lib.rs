//! # Scene Engine
//!
//! Scene-graph runtime for real-time 3D applications.
//!
//! ## Features
//!
//! - **Object Tree**: Hierarchical transforms with cached world matrices and
//!   generation-checked handles that expire instead of dangling
//! - **Components**: Drawables, cameras, lights, environment recorders,
//!   rigid bodies, phantoms and user behaviours
//! - **Renderer Registry**: Per-drawable light selection, render masks and
//!   bucketed draw passes over a pluggable graphics backend
//! - **Physics**: Fixed-step simulation, contact and overlap callbacks,
//!   joints, raycasts and culling colliders
//! - **Assets**: File loaders with background loading handed out at frame
//!   boundaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let player = engine.scene.create_object("player")?;
//!         engine.scene.object_mut(player)?.set_position(Vec3::new(0.0, 1.0, 0.0));
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         if engine.frame_count() > 100 {
//!             engine.quit();
//!         }
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, _engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut app = MyApp;
//!     Engine::run(config, Box::new(RecordingBackend::new()), &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod physics;
pub mod render;
pub mod scene;
pub mod spatial;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{FileLoader, LoadCompletion, SerializeInfo},
        config::{Config, EngineConfig},
        foundation::{
            math::{Color, Mat4, Quat, Transform, Vec3},
            reference::{SafeReferenceable, WeakReference},
            time::Timer,
        },
        physics::{
            BodyType, CollisionShape, ContactInfo, ContactListener, JointKind, PhantomBody, PhantomType,
            RigidBodyInfo,
        },
        render::{
            Camera, Drawable, EnvironmentRecorder, GraphicsBackend, LightSource, LightType, Material, Mesh,
            RecordingBackend, Viewport,
        },
        scene::{Behaviour, ComponentRef, ObjectRef, Scene, SceneError, UpdateContext},
        AppError, Application, Engine, EngineError,
    };
}
