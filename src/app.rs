use std::sync::Arc;

use anyhow::Result;
use glam::Vec3;
use log::{debug, info};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use crate::animation::AnimationLoop;
use crate::assets::{AssetLoader, AssetStatus, SceneAssets};
use crate::camera::OrbitControls;
use crate::context::AppContext;
use crate::material::TextureSlot;
use crate::pipeline::EffectComposer;
use crate::render::Renderer;
use crate::scene::{Scene, SceneBuilder};
use crate::viewport::{ResizeEvent, Viewport, ViewportManager};

/// Pixels of trackpad travel treated as one wheel line.
const PIXELS_PER_LINE: f64 = 100.0;

/// Reads the window's logical size and device pixel ratio.
pub fn resize_event(window: &Window) -> ResizeEvent {
    let scale = window.scale_factor();
    let logical = window.inner_size().to_logical::<f64>(scale);
    ResizeEvent {
        width: logical.width.round() as u32,
        height: logical.height.round() as u32,
        device_pixel_ratio: scale as f32,
    }
}

pub fn window_viewport(window: &Window) -> Viewport {
    let event = resize_event(window);
    Viewport::new(event.width, event.height, event.device_pixel_ratio)
}

/// Interactive session shared by the native and web hosts.
pub struct App {
    window: Arc<Window>,
    context: AppContext,
    scene: Scene,
    controls: OrbitControls,
    composer: EffectComposer,
    animation: AnimationLoop,
    assets: SceneAssets,
    renderer: Renderer,
    cursor: (f32, f32),
}

impl App {
    /// Wires the session together and starts the texture loads.
    pub fn new(window: Arc<Window>, context: AppContext, scene: Scene, renderer: Renderer) -> Self {
        let controls = SceneBuilder::controls(&scene);
        let composer = EffectComposer::new(context.viewport.width, context.viewport.height);
        let assets = SceneAssets::start(&AssetLoader::new(&context.config));
        if context.debug() {
            info!("debug panel enabled");
        }
        Self {
            window,
            context,
            scene,
            controls,
            composer,
            animation: AnimationLoop::new(),
            assets,
            renderer,
            cursor: (0.0, 0.0),
        }
    }

    /// Requests the first frame; every later frame is requested by the loop itself.
    pub fn start(&self) {
        self.window.request_redraw();
    }

    pub fn frames(&self) -> u64 {
        self.animation.frames()
    }

    pub fn process_event(&mut self, event: &Event<()>, elwt: &ActiveEventLoop) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                let consumed = self.renderer.handle_overlay_event(event);
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        self.handle_resize();
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let logical = position.to_logical::<f32>(self.window.scale_factor());
                        self.cursor = (logical.x, logical.y);
                        if !consumed || self.controls.is_dragging() {
                            self.controls.pointer_move(
                                logical.x,
                                logical.y,
                                self.context.viewport.height as f32,
                            );
                        }
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => match state {
                        ElementState::Pressed if !consumed => {
                            self.controls.pointer_down(self.cursor.0, self.cursor.1);
                        }
                        ElementState::Pressed => {}
                        ElementState::Released => self.controls.pointer_up(),
                    },
                    WindowEvent::MouseWheel { delta, .. } if !consumed => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(position) => {
                                (position.y / PIXELS_PER_LINE) as f32
                            }
                        };
                        self.controls.wheel(lines);
                    }
                    WindowEvent::RedrawRequested => {
                        self.animation.tick(
                            &mut self.context,
                            &mut self.scene,
                            &mut self.controls,
                            &self.composer,
                            &mut self.renderer,
                            self.window.as_ref(),
                        )?;
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let settled = self
                    .assets
                    .poll(&self.context.material, &mut self.renderer);
                if settled > 0 {
                    debug!("{settled} texture load(s) settled");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_resize(&mut self) {
        ViewportManager::handle_resize(
            &mut self.context,
            resize_event(&self.window),
            &mut self.scene.camera,
            &mut self.renderer,
            &mut self.composer,
        );
    }
}

/// Prints the session state the way the summary mode reports it.
pub fn print_final_state(
    context: &AppContext,
    scene: &Scene,
    composer: &EffectComposer,
    assets: &SceneAssets,
    frames: u64,
) {
    let camera = &scene.camera;
    println!(
        "Scene: {} shapes, camera fov {} at {}, viewport {}x{}",
        scene.shapes.len(),
        camera.fov,
        triple(camera.position),
        context.viewport.width,
        context.viewport.height
    );
    for shape in &scene.shapes {
        println!(
            " - {} pos={} rot={}",
            shape.kind.name(),
            triple(shape.position),
            triple(shape.rotation)
        );
    }

    let bloom = composer.bloom_settings();
    println!(
        "Bloom: {}x{} strength={:.2} radius={:.2} threshold={:.2}",
        bloom.resolution.0, bloom.resolution.1, bloom.strength, bloom.radius, bloom.threshold
    );

    println!("Assets:");
    for slot in TextureSlot::ALL {
        let status = match assets.status(slot) {
            Some(AssetStatus::Loaded { width, height }) => format!("loaded {width}x{height}"),
            Some(AssetStatus::Failed(reason)) => format!("failed ({reason})"),
            Some(AssetStatus::Pending) | None => "pending".to_string(),
        };
        println!(" - {}: {status}", slot.label());
    }

    let material = context.material.read();
    println!(
        "Material: roughness={:.2} transmission={:.2} thickness={:.2} env reflections={}",
        material.roughness,
        material.transmission,
        material.thickness,
        if material.reflects_environment() { "on" } else { "off" }
    );
    println!(
        "Debug panel: {}",
        if context.debug() { "enabled" } else { "disabled" }
    );
    println!("Frames rendered: {frames}");
}

/// Formats a vector to two decimals without printing `-0.00`.
fn triple(v: Vec3) -> String {
    let v = (v * 100.0).round() / 100.0 + Vec3::ZERO;
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_drops_negative_zero() {
        assert_eq!(triple(Vec3::new(-1e-7, 8.0, -0.0)), "(0.00, 8.00, 0.00)");
        assert_eq!(triple(Vec3::new(-0.85, 0.854, 1.12)), "(-0.85, 0.85, 1.12)");
    }
}
