use anyhow::{anyhow, Result};

use crate::scene::Scene;

/// Parameters of the bloom stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    /// Logical viewport size the bloom runs at.
    pub resolution: (u32, u32),
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

impl BloomSettings {
    pub const STRENGTH: f32 = 0.5;
    pub const RADIUS: f32 = 0.33;
    pub const THRESHOLD: f32 = 0.85;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: (width, height),
            strength: Self::STRENGTH,
            radius: Self::RADIUS,
            threshold: Self::THRESHOLD,
        }
    }
}

/// One stage of the effect chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Pass {
    /// Draws the scene from its camera.
    Render,
    Bloom(BloomSettings),
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Bloom(_) => "bloom",
        }
    }
}

/// Executes passes. A frame returned by one pass is the only input the next pass sees.
pub trait PassBackend {
    type Frame;

    fn render_scene(&mut self, scene: &Scene) -> Result<Self::Frame>;
    fn bloom(&mut self, input: Self::Frame, settings: &BloomSettings) -> Result<Self::Frame>;
    fn present(&mut self, frame: Self::Frame) -> Result<()>;
}

/// Fixed two-stage chain: base render, then bloom.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectComposer {
    passes: Vec<Pass>,
}

impl EffectComposer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            passes: vec![Pass::Render, Pass::Bloom(BloomSettings::new(width, height))],
        }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn bloom_settings(&self) -> BloomSettings {
        self.passes
            .iter()
            .find_map(|pass| match pass {
                Pass::Bloom(settings) => Some(*settings),
                Pass::Render => None,
            })
            .unwrap_or_else(|| BloomSettings::new(1, 1))
    }

    /// Moves the bloom resolution to the new viewport size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        for pass in &mut self.passes {
            if let Pass::Bloom(settings) = pass {
                settings.resolution = (width, height);
            }
        }
    }

    /// Runs every pass once, in order, and presents the last output.
    pub fn render<B: PassBackend>(&self, backend: &mut B, scene: &Scene) -> Result<()> {
        let mut frame: Option<B::Frame> = None;
        for pass in &self.passes {
            frame = Some(match pass {
                Pass::Render => backend.render_scene(scene)?,
                Pass::Bloom(settings) => {
                    let input = frame
                        .take()
                        .ok_or_else(|| anyhow!("bloom pass has no input frame"))?;
                    backend.bloom(input, settings)?
                }
            });
        }
        let frame = frame.ok_or_else(|| anyhow!("effect chain produced no frame"))?;
        backend.present(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::context::AppContext;
    use crate::scene::SceneBuilder;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Scene(u32),
        Bloom { input: u32, output: u32 },
        Present(u32),
    }

    #[derive(Default)]
    struct Recorder {
        next: u32,
        calls: Vec<Call>,
        settings: Vec<BloomSettings>,
        fail_scene: bool,
    }

    impl PassBackend for Recorder {
        type Frame = u32;

        fn render_scene(&mut self, _scene: &Scene) -> Result<u32> {
            if self.fail_scene {
                return Err(anyhow!("device lost"));
            }
            self.next += 1;
            self.calls.push(Call::Scene(self.next));
            Ok(self.next)
        }

        fn bloom(&mut self, input: u32, settings: &BloomSettings) -> Result<u32> {
            self.next += 1;
            self.calls.push(Call::Bloom {
                input,
                output: self.next,
            });
            self.settings.push(*settings);
            Ok(self.next)
        }

        fn present(&mut self, frame: u32) -> Result<()> {
            self.calls.push(Call::Present(frame));
            Ok(())
        }
    }

    fn scene() -> Scene {
        SceneBuilder::build(&AppContext::headless(SessionConfig::default()))
    }

    #[test]
    fn passes_are_render_then_bloom() {
        let composer = EffectComposer::new(1280, 720);
        let names: Vec<_> = composer.passes().iter().map(Pass::name).collect();
        assert_eq!(names, ["render", "bloom"]);
        let bloom = composer.bloom_settings();
        assert_eq!(bloom.resolution, (1280, 720));
        assert_eq!(bloom.strength, 0.5);
        assert_eq!(bloom.radius, 0.33);
        assert_eq!(bloom.threshold, 0.85);
    }

    #[test]
    fn bloom_consumes_the_fresh_scene_frame_every_time() {
        let composer = EffectComposer::new(1280, 720);
        let scene = scene();
        let mut backend = Recorder::default();
        for _ in 0..3 {
            composer.render(&mut backend, &scene).unwrap();
        }
        assert_eq!(
            backend.calls,
            vec![
                Call::Scene(1),
                Call::Bloom { input: 1, output: 2 },
                Call::Present(2),
                Call::Scene(3),
                Call::Bloom { input: 3, output: 4 },
                Call::Present(4),
                Call::Scene(5),
                Call::Bloom { input: 5, output: 6 },
                Call::Present(6),
            ]
        );
        assert!(backend.settings.iter().all(|s| *s == composer.bloom_settings()));
    }

    #[test]
    fn failed_scene_pass_skips_bloom_and_present() {
        let composer = EffectComposer::new(1280, 720);
        let mut backend = Recorder {
            fail_scene: true,
            ..Recorder::default()
        };
        assert!(composer.render(&mut backend, &scene()).is_err());
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn resizing_only_moves_bloom_resolution() {
        let mut composer = EffectComposer::new(1920, 1080);
        composer.set_size(800, 600);
        let bloom = composer.bloom_settings();
        assert_eq!(bloom.resolution, (800, 600));
        assert_eq!(
            (bloom.strength, bloom.radius, bloom.threshold),
            (0.5, 0.33, 0.85)
        );
    }
}
