use anyhow::Result;
use glam::Vec3;

use crate::camera::OrbitControls;
use crate::clock::FrameTime;
use crate::context::AppContext;
use crate::pipeline::{EffectComposer, PassBackend};
use crate::scene::Scene;

/// Radians per second about the X axis.
pub const SPIN_X: f32 = 0.5;
/// Radians per second about the Y axis.
pub const SPIN_Y: f32 = 0.56;

/// Host primitive that runs the next tick on a later frame.
pub trait FrameScheduler {
    fn schedule_next_frame(&self);
}

// On the web `request_redraw` is backed by `requestAnimationFrame`.
impl FrameScheduler for winit::window::Window {
    fn schedule_next_frame(&self) {
        self.request_redraw();
    }
}

/// Shape orientation at an absolute elapsed time.
pub fn rotation_at(elapsed: f32) -> Vec3 {
    Vec3::new(elapsed * SPIN_X, elapsed * SPIN_Y, 0.0)
}

/// Per-frame driver: clock, shape rotation, controls, render, reschedule.
#[derive(Debug, Default)]
pub struct AnimationLoop {
    frames: u64,
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one tick. On error the loop is not rescheduled.
    pub fn tick<B: PassBackend>(
        &mut self,
        context: &mut AppContext,
        scene: &mut Scene,
        controls: &mut OrbitControls,
        composer: &EffectComposer,
        backend: &mut B,
        scheduler: &dyn FrameScheduler,
    ) -> Result<FrameTime> {
        let time = context.clock.tick();

        let rotation = rotation_at(time.elapsed as f32);
        for shape in &mut scene.shapes {
            shape.rotation.x = rotation.x;
            shape.rotation.y = rotation.y;
        }

        controls.update(&mut scene.camera);
        composer.render(backend, scene)?;

        self.frames += 1;
        scheduler.schedule_next_frame();
        Ok(time)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;
    use crate::clock::ManualTime;
    use crate::config::SessionConfig;
    use crate::debug_panel::{DebugPanel, MaterialField};
    use crate::pipeline::BloomSettings;
    use crate::render::HeadlessBackend;
    use crate::scene::{SceneBuilder, ShapeKind};
    use crate::viewport::{ResizeEvent, ViewportManager};

    #[derive(Default)]
    struct CountingScheduler {
        scheduled: Cell<u32>,
    }

    impl FrameScheduler for CountingScheduler {
        fn schedule_next_frame(&self) {
            self.scheduled.set(self.scheduled.get() + 1);
        }
    }

    struct Harness {
        time: ManualTime,
        context: AppContext,
        scene: Scene,
        controls: OrbitControls,
        composer: EffectComposer,
        backend: HeadlessBackend,
        scheduler: CountingScheduler,
        animation: AnimationLoop,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(SessionConfig::default())
        }

        fn with_config(config: SessionConfig) -> Self {
            let time = ManualTime::new();
            let context = AppContext::with_manual_time(config, time.clone());
            let scene = SceneBuilder::build(&context);
            let controls = SceneBuilder::controls(&scene);
            let backend = HeadlessBackend::new(context.viewport);
            Self {
                time,
                composer: EffectComposer::new(context.viewport.width, context.viewport.height),
                context,
                scene,
                controls,
                backend,
                scheduler: CountingScheduler::default(),
                animation: AnimationLoop::new(),
            }
        }

        fn tick(&mut self) -> Result<FrameTime> {
            self.animation.tick(
                &mut self.context,
                &mut self.scene,
                &mut self.controls,
                &self.composer,
                &mut self.backend,
                &self.scheduler,
            )
        }
    }

    #[test]
    fn first_tick_leaves_shapes_unrotated() {
        let mut harness = Harness::new();
        harness.tick().unwrap();
        for shape in &harness.scene.shapes {
            assert_eq!(shape.rotation, Vec3::ZERO);
        }
    }

    #[test]
    fn rotation_at_two_seconds() {
        let mut harness = Harness::new();
        harness.tick().unwrap();
        harness.time.advance(2.0);
        let time = harness.tick().unwrap();
        assert_eq!(time.elapsed, 2.0);
        let ico = harness.scene.shape(ShapeKind::Icosahedron).unwrap();
        assert_eq!(ico.rotation.x, 1.0);
        assert!((ico.rotation.y - 1.12).abs() < 1e-6);
        for shape in &harness.scene.shapes {
            assert_eq!(shape.rotation, ico.rotation);
        }
    }

    #[test]
    fn rotation_is_independent_of_frame_rate() {
        let mut coarse = Harness::new();
        let mut fine = Harness::new();
        coarse.tick().unwrap();
        fine.tick().unwrap();
        coarse.time.advance(3.0);
        coarse.tick().unwrap();
        for _ in 0..180 {
            fine.time.advance(1.0 / 60.0);
            fine.tick().unwrap();
        }
        let expected = rotation_at(fine.context.clock.last_elapsed() as f32);
        assert_eq!(fine.scene.shapes[0].rotation, expected);
        let drift = coarse.scene.shapes[0].rotation - fine.scene.shapes[0].rotation;
        assert!(drift.length() < 1e-4);
    }

    #[test]
    fn each_tick_renders_once_and_reschedules() {
        let mut harness = Harness::new();
        for _ in 0..5 {
            harness.time.advance(0.1);
            harness.tick().unwrap();
        }
        assert_eq!(harness.animation.frames(), 5);
        assert_eq!(harness.scheduler.scheduled.get(), 5);
        assert_eq!(harness.backend.frames_presented(), 5);
        let bloom = BloomSettings::new(1280, 720);
        assert!(harness.backend.bloom_history().iter().all(|s| *s == bloom));
    }

    #[test]
    fn failing_tick_is_not_rescheduled() {
        struct Broken;
        impl PassBackend for Broken {
            type Frame = ();
            fn render_scene(&mut self, _scene: &Scene) -> Result<()> {
                Err(anyhow!("surface gone"))
            }
            fn bloom(&mut self, _input: (), _settings: &BloomSettings) -> Result<()> {
                Ok(())
            }
            fn present(&mut self, _frame: ()) -> Result<()> {
                Ok(())
            }
        }

        let mut harness = Harness::new();
        let result = harness.animation.tick(
            &mut harness.context,
            &mut harness.scene,
            &mut harness.controls,
            &harness.composer,
            &mut Broken,
            &harness.scheduler,
        );
        assert!(result.is_err());
        assert_eq!(harness.scheduler.scheduled.get(), 0);
        assert_eq!(harness.animation.frames(), 0);
    }

    #[test]
    fn resize_before_a_tick_moves_bloom_to_the_new_viewport() {
        let mut harness = Harness::new();
        harness.tick().unwrap();
        let applied = ViewportManager::handle_resize(
            &mut harness.context,
            ResizeEvent {
                width: 800,
                height: 600,
                device_pixel_ratio: 3.0,
            },
            &mut harness.scene.camera,
            &mut harness.backend,
            &mut harness.composer,
        );
        assert!(applied);
        harness.time.advance(0.5);
        harness.tick().unwrap();

        let history = harness.backend.bloom_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].resolution, (1280, 720));
        assert_eq!(history[1].resolution, (800, 600));
        assert_eq!(harness.composer.bloom_settings().resolution, (800, 600));
        assert_eq!(harness.backend.size(), (800, 600));
        assert_eq!(harness.backend.drawing_buffer_size(), (1600, 1200));
        assert!((harness.scene.camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn panel_edits_are_seen_by_the_next_frame() {
        let mut harness = Harness::with_config(SessionConfig::from_fragment("#debug"));
        harness.tick().unwrap();
        assert_eq!(harness.backend.last_material().unwrap().roughness, 0.6);

        let panel = DebugPanel::for_session(&harness.context).unwrap();
        panel.set(MaterialField::Roughness, 0.257);
        panel.set(MaterialField::Thickness, 9.0);
        harness.tick().unwrap();

        let rendered = harness.backend.last_material().unwrap();
        assert!((rendered.roughness - 0.26).abs() < 1e-6);
        assert_eq!(rendered.thickness, 5.0);
        for shape in &harness.scene.shapes {
            assert!(shape.material().same_instance(&harness.context.material));
        }
    }

    #[test]
    fn material_edits_reach_the_next_render() {
        let mut harness = Harness::new();
        harness.tick().unwrap();
        harness.context.material.update(|m| m.roughness = 0.2);
        harness.tick().unwrap();
        assert_eq!(harness.backend.last_material().map(|m| m.roughness), Some(0.2));
    }
}
