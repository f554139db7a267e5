use anyhow::Result;

use crate::assets::{TextureData, TextureSink};
use crate::material::{PhysicalMaterial, TextureSlot};
use crate::pipeline::{BloomSettings, PassBackend};
use crate::scene::Scene;
use crate::viewport::{drawing_buffer_size, RenderTarget, Viewport};

/// Frame handle passed between headless passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessFrame {
    pub id: u64,
    pub bloomed: bool,
}

/// Backend without a GPU. Records what each pass was asked to do.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    size: (u32, u32),
    pixel_ratio: f32,
    next_frame: u64,
    frames_presented: u64,
    bloom_history: Vec<BloomSettings>,
    last_material: Option<PhysicalMaterial>,
    textures: Vec<(TextureSlot, u32, u32)>,
}

impl HeadlessBackend {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            size: (viewport.width, viewport.height),
            pixel_ratio: viewport.pixel_ratio(),
            next_frame: 0,
            frames_presented: 0,
            bloom_history: Vec::new(),
            last_material: None,
            textures: Vec::new(),
        }
    }

    /// Logical output size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        drawing_buffer_size(self.size.0, self.size.1, self.pixel_ratio)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn bloom_history(&self) -> &[BloomSettings] {
        &self.bloom_history
    }

    /// Material as it was when the most recent scene pass ran.
    pub fn last_material(&self) -> Option<&PhysicalMaterial> {
        self.last_material.as_ref()
    }

    pub fn uploaded_textures(&self) -> &[(TextureSlot, u32, u32)] {
        &self.textures
    }
}

impl PassBackend for HeadlessBackend {
    type Frame = HeadlessFrame;

    fn render_scene(&mut self, scene: &Scene) -> Result<HeadlessFrame> {
        self.last_material = Some(scene.material().snapshot());
        self.next_frame += 1;
        Ok(HeadlessFrame {
            id: self.next_frame,
            bloomed: false,
        })
    }

    fn bloom(&mut self, input: HeadlessFrame, settings: &BloomSettings) -> Result<HeadlessFrame> {
        self.bloom_history.push(*settings);
        Ok(HeadlessFrame {
            bloomed: true,
            ..input
        })
    }

    fn present(&mut self, _frame: HeadlessFrame) -> Result<()> {
        self.frames_presented += 1;
        Ok(())
    }
}

impl RenderTarget for HeadlessBackend {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }
}

impl TextureSink for HeadlessBackend {
    fn upload_texture(&mut self, slot: TextureSlot, texture: &TextureData) {
        self.textures.retain(|(existing, _, _)| *existing != slot);
        self.textures.push((slot, texture.width, texture.height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::context::AppContext;
    use crate::pipeline::EffectComposer;
    use crate::scene::SceneBuilder;

    #[test]
    fn composer_drives_the_headless_backend() {
        let context = AppContext::headless(SessionConfig::default());
        let scene = SceneBuilder::build(&context);
        let composer = EffectComposer::new(1280, 720);
        let mut backend = HeadlessBackend::new(context.viewport);
        composer.render(&mut backend, &scene).unwrap();
        composer.render(&mut backend, &scene).unwrap();
        assert_eq!(backend.frames_presented(), 2);
        assert_eq!(backend.bloom_history().len(), 2);
        assert_eq!(backend.last_material().map(|m| m.thickness), Some(1.2));
    }

    #[test]
    fn drawing_buffer_follows_ratio() {
        let mut backend = HeadlessBackend::new(Viewport::new(800, 600, 1.0));
        backend.set_pixel_ratio(2.0);
        assert_eq!(backend.drawing_buffer_size(), (1600, 1200));
    }
}
