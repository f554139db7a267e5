use log::debug;

use crate::camera::PerspectiveCamera;
use crate::context::AppContext;
use crate::pipeline::EffectComposer;

/// Upper bound on the renderer pixel ratio.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Window size in logical pixels plus the display's device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            device_pixel_ratio: sanitize_ratio(device_pixel_ratio),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Device pixel ratio clamped to [`MAX_PIXEL_RATIO`].
    pub fn pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
    }

    /// Size of the offscreen buffers: logical size scaled by the clamped ratio.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        drawing_buffer_size(self.width, self.height, self.pixel_ratio())
    }
}

pub fn drawing_buffer_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * pixel_ratio).floor() as u32).max(1);
    (scale(width), scale(height))
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// Window resize notification, read back from the current window dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEvent {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

/// Output surface whose resolution follows the viewport.
pub trait RenderTarget {
    /// Logical output size.
    fn set_size(&mut self, width: u32, height: u32);
    fn set_pixel_ratio(&mut self, ratio: f32);
}

/// Keeps camera projection, renderer resolution and bloom resolution in step
/// with the window.
pub struct ViewportManager;

impl ViewportManager {
    /// Applies a resize. Events with a zero dimension leave everything untouched.
    /// Returns whether the event was applied.
    pub fn handle_resize(
        context: &mut AppContext,
        event: ResizeEvent,
        camera: &mut PerspectiveCamera,
        renderer: &mut dyn RenderTarget,
        composer: &mut EffectComposer,
    ) -> bool {
        if event.width == 0 || event.height == 0 {
            debug!("ignoring resize to {}x{}", event.width, event.height);
            return false;
        }

        let viewport = Viewport::new(event.width, event.height, event.device_pixel_ratio);
        context.viewport = viewport;

        camera.aspect = viewport.aspect();
        camera.update_projection_matrix();

        renderer.set_size(viewport.width, viewport.height);
        renderer.set_pixel_ratio(viewport.pixel_ratio());

        composer.set_size(viewport.width, viewport.height);
        debug!(
            "viewport resized to {}x{} (pixel ratio {})",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::render::HeadlessBackend;
    use crate::scene::SceneBuilder;

    fn resize(width: u32, height: u32, dpr: f32) -> ResizeEvent {
        ResizeEvent {
            width,
            height,
            device_pixel_ratio: dpr,
        }
    }

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        assert_eq!(Viewport::new(800, 600, 1.0).pixel_ratio(), 1.0);
        assert_eq!(Viewport::new(800, 600, 1.5).pixel_ratio(), 1.5);
        assert_eq!(Viewport::new(800, 600, 3.0).pixel_ratio(), 2.0);
        assert_eq!(Viewport::new(800, 600, 3.0).drawing_buffer_size(), (1600, 1200));
        assert_eq!(Viewport::new(800, 600, f32::NAN).pixel_ratio(), 1.0);
    }

    #[test]
    fn resize_keeps_camera_renderer_and_bloom_in_sync() {
        let config = SessionConfig::default().with_initial_size(1920, 1080);
        let mut context = AppContext::headless(config);
        let mut scene = SceneBuilder::build(&context);
        let mut backend = HeadlessBackend::new(context.viewport);
        let mut composer = EffectComposer::new(1920, 1080);
        assert!((scene.camera.aspect - 1.778).abs() < 1e-3);

        let events = [resize(800, 600, 1.0), resize(1024, 300, 3.0), resize(640, 640, 2.0)];
        for event in events {
            assert!(ViewportManager::handle_resize(
                &mut context,
                event,
                &mut scene.camera,
                &mut backend,
                &mut composer,
            ));
            let expected_aspect = event.width as f32 / event.height as f32;
            assert_eq!(scene.camera.aspect, expected_aspect);
            let expected = PerspectiveCamera::new(35.0, expected_aspect, 0.1, 100.0);
            assert_eq!(scene.camera.projection_matrix(), expected.projection_matrix());
            assert_eq!(backend.size(), (event.width, event.height));
            assert_eq!(
                backend.pixel_ratio(),
                event.device_pixel_ratio.min(MAX_PIXEL_RATIO)
            );
            assert_eq!(composer.bloom_settings().resolution, (event.width, event.height));
            assert_eq!(context.viewport.width, event.width);
        }
    }

    #[test]
    fn scenario_full_hd_to_800_by_600() {
        let config = SessionConfig::default().with_initial_size(1920, 1080);
        let mut context = AppContext::headless(config);
        let mut scene = SceneBuilder::build(&context);
        let mut backend = HeadlessBackend::new(context.viewport);
        let mut composer = EffectComposer::new(1920, 1080);
        ViewportManager::handle_resize(
            &mut context,
            resize(800, 600, 1.0),
            &mut scene.camera,
            &mut backend,
            &mut composer,
        );
        assert!((scene.camera.aspect - 1.333).abs() < 1e-3);
        assert_eq!(backend.size(), (800, 600));
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut context = AppContext::headless(SessionConfig::default());
        let mut scene = SceneBuilder::build(&context);
        let mut backend = HeadlessBackend::new(context.viewport);
        let mut composer = EffectComposer::new(1280, 720);
        let before = scene.camera.clone();
        assert!(!ViewportManager::handle_resize(
            &mut context,
            resize(0, 600, 1.0),
            &mut scene.camera,
            &mut backend,
            &mut composer,
        ));
        assert_eq!(scene.camera, before);
        assert_eq!(backend.size(), (1280, 720));
        assert_eq!(context.viewport.width, 1280);
    }
}
