use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec2};
use log::{info, warn};
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;
use winit::window::{Window, WindowId};

use crate::assets::{ColorSpace, TextureData, TexturePixels, TextureSink, Wrap};
use crate::context::AppContext;
use crate::debug_panel::DebugPanel;
use crate::geometry::{MeshData, Vertex};
use crate::material::{Mapping, TextureSlot};
use crate::pipeline::{BloomSettings, PassBackend};
use crate::scene::{Scene, ShapeKind};
use crate::viewport::{drawing_buffer_size, RenderTarget};

use super::bloom::BloomChain;
use super::common::{BlitUniform, FrameUniform, GlassUniform, ObjectUniform};
use super::overlay::Overlay;
use super::shared;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Which offscreen image a frame currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameSource {
    Scene,
    Bloom,
}

/// Recorded but unsubmitted GPU work for one frame.
pub struct GpuFrame {
    encoder: wgpu::CommandEncoder,
    source: FrameSource,
}

/// GPU renderer backed by wgpu: background, glass, bloom, output blit and
/// the optional debug overlay.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    logical_size: (u32, u32),
    pixel_ratio: f32,
    hdr_format: wgpu::TextureFormat,
    targets: FrameTargets,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    background_draw: MeshDraw,
    shape_draws: Vec<(ShapeKind, MeshDraw)>,
    background_pipeline: wgpu::RenderPipeline,
    glass_pipeline: wgpu::RenderPipeline,
    background_layout: wgpu::BindGroupLayout,
    glass_layout: wgpu::BindGroupLayout,
    clamp_sampler: wgpu::Sampler,
    textures: MaterialTextures,
    glass_buffer: wgpu::Buffer,
    background_bind_group: wgpu::BindGroup,
    glass_bind_group: wgpu::BindGroup,
    bloom: BloomChain,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_buffer: wgpu::Buffer,
    blit_bind_groups: [wgpu::BindGroup; 2],
    overlay: Option<Overlay>,
}

impl Renderer {
    /// Initializes the GPU renderer for the window and uploads the scene meshes.
    pub async fn new(window: Arc<Window>, context: &AppContext, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: if cfg!(target_arch = "wasm32") {
                wgpu::Backends::GL
            } else {
                wgpu::Backends::PRIMARY
            },
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("failed to acquire GPU adapter"))?;

        let required_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let hdr_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let hdr_format = if adapter
            .get_texture_format_features(wgpu::TextureFormat::Rgba16Float)
            .allowed_usages
            .contains(hdr_usage)
        {
            wgpu::TextureFormat::Rgba16Float
        } else {
            warn!("Rgba16Float is not renderable; bloom runs in 8-bit");
            wgpu::TextureFormat::Rgba8Unorm
        };

        let viewport = context.viewport;
        let pixel_ratio = viewport.pixel_ratio();
        let logical_size = (viewport.width, viewport.height);
        let buffer_size = viewport.drawing_buffer_size();
        let targets = FrameTargets::new(&device, hdr_format, buffer_size);

        let clamp_sampler = create_sampler(&device, "clamp-sampler", wgpu::AddressMode::ClampToEdge);

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-layout"),
            entries: &[uniform_entry(0)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-layout"),
            entries: &[uniform_entry(0)],
        });
        let background_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background-layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let glass_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glass-layout"),
            entries: &[
                uniform_entry(0),
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
                texture_entry(5),
            ],
        });
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit-layout"),
            entries: &[uniform_entry(0), texture_entry(1), sampler_entry(2)],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame-uniform"),
            contents: bytemuck::bytes_of(&FrameUniform::from_scene(scene, buffer_size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let background_draw = MeshDraw::new(
            &device,
            &object_layout,
            "background",
            &scene.background.geometry.tessellate(),
        );
        let shape_draws = scene
            .shapes
            .iter()
            .map(|shape| {
                let mesh = shape.geometry.tessellate();
                (
                    shape.kind,
                    MeshDraw::new(&device, &object_layout, shape.kind.name(), &mesh),
                )
            })
            .collect();

        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::background_shader().into()),
        });
        let glass_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glass-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::glass_shader().into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::blit_shader().into()),
        });

        let background_pipeline = mesh_pipeline(
            &device,
            "background",
            &background_shader,
            &[&frame_layout, &object_layout, &background_layout],
            hdr_format,
        );
        let glass_pipeline = mesh_pipeline(
            &device,
            "glass",
            &glass_shader,
            &[&frame_layout, &object_layout, &glass_layout],
            hdr_format,
        );
        let blit_pipeline =
            fullscreen_pipeline(&device, "blit", &blit_shader, &blit_layout, surface_format);

        let textures = MaterialTextures::placeholders(&device, &queue);
        let glass_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glass-uniform"),
            contents: bytemuck::bytes_of(&GlassUniform::from_material(
                &context.material.read(),
                None,
                false,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let background_bind_group = background_bind_group(&device, &background_layout, &textures);
        let glass_bind_group = glass_bind_group(
            &device,
            &glass_layout,
            &glass_buffer,
            &targets,
            &textures,
            &clamp_sampler,
        );

        let bloom_settings = BloomSettings::new(logical_size.0, logical_size.1);
        let bloom = BloomChain::new(
            &device,
            hdr_format,
            buffer_size,
            &targets.color.view,
            &clamp_sampler,
            &bloom_settings,
        );

        let blit_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit-uniform"),
            contents: bytemuck::bytes_of(&BlitUniform {
                encode_srgb: if surface_format.is_srgb() { 0.0 } else { 1.0 },
                _padding: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let blit_bind_groups = blit_bind_groups(
            &device,
            &blit_layout,
            &blit_buffer,
            &targets.color.view,
            bloom.output(),
            &clamp_sampler,
        );

        let overlay = DebugPanel::for_session(context)
            .map(|panel| Overlay::new(&window, &device, surface_format, panel));

        info!(
            "renderer ready: surface {:?}, offscreen {:?} at {}x{}",
            surface_format, hdr_format, buffer_size.0, buffer_size.1
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            logical_size,
            pixel_ratio,
            hdr_format,
            targets,
            frame_buffer,
            frame_bind_group,
            background_draw,
            shape_draws,
            background_pipeline,
            glass_pipeline,
            background_layout,
            glass_layout,
            clamp_sampler,
            textures,
            glass_buffer,
            background_bind_group,
            glass_bind_group,
            bloom,
            blit_pipeline,
            blit_layout,
            blit_buffer,
            blit_bind_groups,
            overlay,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Offers a window event to the overlay. Returns true when the overlay consumed it.
    pub fn handle_overlay_event(&mut self, event: &WindowEvent) -> bool {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.on_window_event(&self.window, event),
            None => false,
        }
    }

    fn buffer_size(&self) -> (u32, u32) {
        drawing_buffer_size(self.logical_size.0, self.logical_size.1, self.pixel_ratio)
    }

    /// Reconfigures the swapchain to the window's current physical size.
    pub fn reconfigure_surface(&mut self) {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn resize_targets(&mut self) {
        self.reconfigure_surface();
        let buffer_size = self.buffer_size();
        if buffer_size == self.targets.size {
            return;
        }
        self.targets = FrameTargets::new(&self.device, self.hdr_format, buffer_size);
        self.glass_bind_group = glass_bind_group(
            &self.device,
            &self.glass_layout,
            &self.glass_buffer,
            &self.targets,
            &self.textures,
            &self.clamp_sampler,
        );
        self.bloom
            .rebind_scene(&self.device, &self.targets.color.view, &self.clamp_sampler);
        self.rebuild_blit_bind_groups();
    }

    fn rebuild_blit_bind_groups(&mut self) {
        self.blit_bind_groups = blit_bind_groups(
            &self.device,
            &self.blit_layout,
            &self.blit_buffer,
            &self.targets.color.view,
            self.bloom.output(),
            &self.clamp_sampler,
        );
    }

    fn rebuild_material_bind_groups(&mut self) {
        self.background_bind_group =
            background_bind_group(&self.device, &self.background_layout, &self.textures);
        self.glass_bind_group = glass_bind_group(
            &self.device,
            &self.glass_layout,
            &self.glass_buffer,
            &self.targets,
            &self.textures,
            &self.clamp_sampler,
        );
    }
}

impl PassBackend for Renderer {
    type Frame = GpuFrame;

    fn render_scene(&mut self, scene: &Scene) -> Result<GpuFrame> {
        let material = scene.material().snapshot();
        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniform::from_scene(scene, self.targets.size)),
        );
        self.queue.write_buffer(
            &self.glass_buffer,
            0,
            bytemuck::bytes_of(&GlassUniform::from_material(
                &material,
                self.textures.normal_repeat,
                self.textures.environment_loaded,
            )),
        );
        self.background_draw
            .write_model(&self.queue, scene.background.model_matrix());
        for shape in &scene.shapes {
            let draw = self
                .shape_draws
                .iter()
                .find(|(kind, _)| *kind == shape.kind)
                .map(|(_, draw)| draw)
                .ok_or_else(|| anyhow!("no mesh uploaded for {}", shape.kind.name()))?;
            draw.write_model(&self.queue, shape.model_matrix());
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let clear = scene.clear_color;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("background-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(clear.x),
                            g: f64::from(clear.y),
                            b: f64::from(clear.z),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.background_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_bind_group(2, &self.background_bind_group, &[]);
            self.background_draw.draw(&mut pass);
        }

        // Glass refracts whatever is behind it, so it samples a copy of the background.
        encoder.copy_texture_to_texture(
            self.targets.color.texture.as_image_copy(),
            self.targets.transmission.texture.as_image_copy(),
            self.targets.extent(),
        );

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glass-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.glass_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_bind_group(2, &self.glass_bind_group, &[]);
            for (_, draw) in &self.shape_draws {
                draw.draw(&mut pass);
            }
        }

        Ok(GpuFrame {
            encoder,
            source: FrameSource::Scene,
        })
    }

    fn bloom(&mut self, mut frame: GpuFrame, settings: &BloomSettings) -> Result<GpuFrame> {
        let (width, height) = settings.resolution;
        let bloom_size = drawing_buffer_size(width, height, self.pixel_ratio);
        if bloom_size != self.bloom.size() {
            self.bloom = BloomChain::new(
                &self.device,
                self.hdr_format,
                bloom_size,
                &self.targets.color.view,
                &self.clamp_sampler,
                settings,
            );
            self.rebuild_blit_bind_groups();
        }
        self.bloom.encode(&self.queue, &mut frame.encoder, settings);
        frame.source = FrameSource::Bloom;
        Ok(frame)
    }

    fn present(&mut self, frame: GpuFrame) -> Result<()> {
        let GpuFrame {
            mut encoder,
            source,
        } = frame;
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost; reconfiguring");
                self.reconfigure_surface();
                self.queue.submit(std::iter::once(encoder.finish()));
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(err) => {
                info!("{err}; retrying next frame");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = match source {
            FrameSource::Scene => &self.blit_bind_groups[0],
            FrameSource::Bloom => &self.blit_bind_groups[1],
        };
        draw_fullscreen(&mut encoder, "blit-pass", &view, &self.blit_pipeline, bind_group);

        let overlay_buffers = match self.overlay.as_mut() {
            Some(overlay) => overlay.paint(
                &self.window,
                &self.device,
                &self.queue,
                &mut encoder,
                &view,
                [self.config.width, self.config.height],
            ),
            None => Vec::new(),
        };

        self.queue
            .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }
}

impl RenderTarget for Renderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
        self.resize_targets();
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
        self.resize_targets();
    }
}

impl TextureSink for Renderer {
    fn upload_texture(&mut self, slot: TextureSlot, texture: &TextureData) {
        let uploaded = GpuTexture::from_data(&self.device, &self.queue, slot.label(), texture);
        match slot {
            TextureSlot::Background => self.textures.background = uploaded,
            TextureSlot::Normal => {
                self.textures.normal = uploaded;
                self.textures.normal_repeat = Some(texture.repeat);
            }
            TextureSlot::Environment => {
                self.textures.environment = uploaded;
                self.textures.environment_loaded = true;
            }
        }
        self.rebuild_material_bind_groups();
    }
}

/// Offscreen colour target with a view.
pub(crate) struct RenderTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
}

impl RenderTexture {
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Scene colour, its transmission copy and depth, all at drawing-buffer size.
struct FrameTargets {
    size: (u32, u32),
    color: RenderTexture,
    transmission: RenderTexture,
    depth: DepthBuffer,
}

impl FrameTargets {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: (u32, u32)) -> Self {
        Self {
            size,
            color: RenderTexture::new(device, "scene-color", size, format),
            transmission: RenderTexture::new(device, "transmission", size, format),
            depth: DepthBuffer::create(device, size),
        }
    }

    fn extent(&self) -> wgpu::Extent3d {
        extent(self.size)
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Uploaded texture with a sampler built from its wrap mode.
struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTexture {
    fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        data: &TextureData,
    ) -> Self {
        let (format, bytes, bytes_per_pixel): (_, &[u8], u32) = match &data.pixels {
            TexturePixels::Rgba8(pixels) => {
                let format = match data.color_space {
                    ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
                    ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
                };
                (format, pixels.as_slice(), 4)
            }
            TexturePixels::Rgba16Float(pixels) => (
                wgpu::TextureFormat::Rgba16Float,
                bytemuck::cast_slice(pixels.as_slice()),
                8,
            ),
        };
        let size = (data.width.max(1), data.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * size.0),
                rows_per_image: Some(size.1),
            },
            extent(size),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, label, address_mode(data.wrap));
        Self {
            _texture: texture,
            view,
            sampler,
        }
    }

    fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        pixels: TexturePixels,
        color_space: ColorSpace,
        wrap: Wrap,
    ) -> Self {
        let data = TextureData {
            width: 1,
            height: 1,
            pixels,
            color_space,
            wrap,
            repeat: Vec2::ONE,
            mapping: Mapping::Uv,
        };
        Self::from_data(device, queue, label, &data)
    }
}

/// Textures bound to the materials. 1×1 placeholders until loads resolve.
struct MaterialTextures {
    background: GpuTexture,
    normal: GpuTexture,
    environment: GpuTexture,
    /// UV repeat of the loaded normal map; `None` while the placeholder is bound.
    normal_repeat: Option<Vec2>,
    environment_loaded: bool,
}

impl MaterialTextures {
    fn placeholders(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            background: GpuTexture::solid(
                device,
                queue,
                "background-placeholder",
                TexturePixels::Rgba8(vec![31, 30, 28, 255]),
                ColorSpace::Srgb,
                Wrap::Clamp,
            ),
            normal: GpuTexture::solid(
                device,
                queue,
                "normal-placeholder",
                TexturePixels::Rgba8(vec![128, 128, 255, 255]),
                ColorSpace::Linear,
                Wrap::Repeat,
            ),
            environment: GpuTexture::solid(
                device,
                queue,
                "environment-placeholder",
                TexturePixels::Rgba16Float(vec![half::f16::ZERO; 4]),
                ColorSpace::Linear,
                Wrap::Clamp,
            ),
            normal_repeat: None,
            environment_loaded: false,
        }
    }
}

/// Mesh buffers plus the per-object uniform that places them.
struct MeshDraw {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl MeshDraw {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, mesh: &MeshData) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-object")),
            contents: bytemuck::bytes_of(&ObjectUniform::new(Mat4::IDENTITY)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-object-bind-group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
            uniform,
            bind_group,
        }
    }

    fn write_model(&self, queue: &wgpu::Queue, model: Mat4) {
        queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&ObjectUniform::new(model)));
    }

    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn extent(size: (u32, u32)) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.0.max(1),
        height: size.1.max(1),
        depth_or_array_layers: 1,
    }
}

fn address_mode(wrap: Wrap) -> wgpu::AddressMode {
    match wrap {
        Wrap::Clamp => wgpu::AddressMode::ClampToEdge,
        Wrap::Repeat => wgpu::AddressMode::Repeat,
    }
}

fn create_sampler(device: &wgpu::Device, label: &str, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn background_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &MaterialTextures,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("background-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&textures.background.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&textures.background.sampler),
            },
        ],
    })
}

fn glass_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    targets: &FrameTargets,
    textures: &MaterialTextures,
    clamp_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("glass-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&targets.transmission.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(clamp_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&textures.normal.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&textures.normal.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::TextureView(&textures.environment.view),
            },
        ],
    })
}

fn blit_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    scene: &wgpu::TextureView,
    bloomed: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> [wgpu::BindGroup; 2] {
    [scene, bloomed].map(|source| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    })
}

fn mesh_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_fullscreen",
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

pub(crate) fn draw_fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}
