//! Frosted glass shapes floating in front of a textured backdrop, rendered
//! with wgpu through a bloom pass on native windows and in the browser.
//!
//! Scene setup, animation, viewport handling and asset loading are plain
//! Rust and run headless; only [`render::Renderer`] and the hosts need a GPU.

pub mod animation;
pub mod app;
pub mod assets;
pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod debug_panel;
pub mod geometry;
pub mod material;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{AnimationLoop, FrameScheduler};
pub use assets::{AssetError, AssetLoader, AssetStatus, SceneAssets, TextureData, TextureSink};
pub use camera::{OrbitControls, PerspectiveCamera};
pub use clock::{FrameClock, FrameTime, ManualTime, TimeSource};
#[cfg(not(target_arch = "wasm32"))]
pub use config::CliOptions;
pub use config::SessionConfig;
pub use context::AppContext;
pub use debug_panel::DebugPanel;
pub use material::{PhysicalMaterial, SharedMaterial, TextureSlot};
pub use pipeline::{BloomSettings, EffectComposer, PassBackend};
pub use render::{HeadlessBackend, Renderer};
pub use scene::{Scene, SceneBuilder, ShapeKind};
pub use viewport::{RenderTarget, ResizeEvent, Viewport, ViewportManager};
