use crate::clock::{FrameClock, ManualTime};
use crate::config::SessionConfig;
use crate::material::{PhysicalMaterial, SharedMaterial};
use crate::viewport::Viewport;

/// Session-wide state created once at startup and handed by reference to the
/// scene builder, the viewport manager and the animation loop.
#[derive(Debug)]
pub struct AppContext {
    pub config: SessionConfig,
    pub viewport: Viewport,
    pub clock: FrameClock,
    pub material: SharedMaterial,
}

impl AppContext {
    pub fn new(config: SessionConfig, viewport: Viewport, clock: FrameClock) -> Self {
        Self {
            config,
            viewport,
            clock,
            material: SharedMaterial::new(PhysicalMaterial::default()),
        }
    }

    /// Context sized from the config with a unit pixel ratio and a clock that
    /// only moves when `time` is advanced.
    pub fn with_manual_time(config: SessionConfig, time: ManualTime) -> Self {
        let (width, height) = config.initial_size;
        let viewport = Viewport::new(width, height, 1.0);
        Self::new(config, viewport, FrameClock::new(Box::new(time)))
    }

    pub fn headless(config: SessionConfig) -> Self {
        Self::with_manual_time(config, ManualTime::new())
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }
}
