use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::pipeline::BloomSettings;
use crate::render::gpu::{
    draw_fullscreen, fullscreen_pipeline, sampler_entry, texture_entry, uniform_entry,
    RenderTexture,
};
use crate::render::shared;

pub const MIP_COUNT: usize = 5;
/// Per-mip contribution before the radius adjustment.
pub const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const KERNEL_RADII: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];
const MAX_KERNEL: usize = 12;
const SMOOTH_WIDTH: f32 = 0.01;

/// Shifts a mip's factor towards `1.2 - factor` as the radius grows.
pub fn lerp_bloom_factor(factor: f32, radius: f32) -> f32 {
    factor + (1.2 - factor - factor) * radius
}

/// Sizes of the blur mips: half the base size, halving again per level.
pub fn mip_sizes(width: u32, height: u32) -> [(u32, u32); MIP_COUNT] {
    let mut sizes = [(1, 1); MIP_COUNT];
    let (mut w, mut h) = ((width / 2).max(1), (height / 2).max(1));
    for size in &mut sizes {
        *size = (w, h);
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    sizes
}

/// One-sided Gaussian weights with sigma equal to the kernel radius.
pub fn gaussian_weights(kernel_radius: u32) -> [f32; MAX_KERNEL] {
    let sigma = kernel_radius as f32;
    let mut weights = [0.0; MAX_KERNEL];
    for (i, weight) in weights.iter_mut().enumerate().take(kernel_radius as usize) {
        let x = i as f32;
        *weight = 0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma;
    }
    weights
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct HighPassUniform {
    threshold: f32,
    smooth_width: f32,
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct BlurUniform {
    direction: [f32; 2],
    texel_size: [f32; 2],
    kernel_radius: f32,
    _padding: [f32; 3],
    weights: [f32; MAX_KERNEL],
}

impl BlurUniform {
    fn new(direction: [f32; 2], size: (u32, u32), kernel_radius: u32) -> Self {
        Self {
            direction,
            texel_size: [1.0 / size.0 as f32, 1.0 / size.1 as f32],
            kernel_radius: kernel_radius as f32,
            _padding: [0.0; 3],
            weights: gaussian_weights(kernel_radius),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct CompositeUniform {
    factors: [f32; 4],
    last_factor: f32,
    strength: f32,
    _padding: [f32; 2],
}

impl CompositeUniform {
    fn new(settings: &BloomSettings) -> Self {
        let f = BLOOM_FACTORS.map(|factor| lerp_bloom_factor(factor, settings.radius));
        Self {
            factors: [f[0], f[1], f[2], f[3]],
            last_factor: f[4],
            strength: settings.strength,
            _padding: [0.0; 2],
        }
    }
}

struct BlurStage {
    target: RenderTexture,
    _uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertical: bool,
}

/// Offscreen chain: high-pass, separable blur per mip, composite.
pub(crate) struct BloomChain {
    size: (u32, u32),
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    high_pass_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    high_pass_uniform: wgpu::Buffer,
    composite_uniform: wgpu::Buffer,
    high_pass_target: RenderTexture,
    high_pass_bind_group: wgpu::BindGroup,
    stages: Vec<BlurStage>,
    composite_bind_group: wgpu::BindGroup,
    output: RenderTexture,
}

impl BloomChain {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        scene: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        settings: &BloomSettings,
    ) -> Self {
        let sampled_layout = |label: &str| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[uniform_entry(0), texture_entry(1), sampler_entry(2)],
            })
        };
        let high_pass_layout = sampled_layout("bloom-high-pass-layout");
        let blur_layout = sampled_layout("bloom-blur-layout");

        let mut composite_entries = vec![uniform_entry(0), texture_entry(1), sampler_entry(2)];
        composite_entries.extend((0..MIP_COUNT as u32).map(|i| texture_entry(3 + i)));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-composite-layout"),
            entries: &composite_entries,
        });

        let high_pass_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-high-pass-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::high_pass_shader().into()),
        });
        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-blur-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::blur_shader().into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-composite-shader"),
            source: wgpu::ShaderSource::Wgsl(shared::composite_shader().into()),
        });

        let high_pass_pipeline =
            fullscreen_pipeline(device, "bloom-high-pass", &high_pass_shader, &high_pass_layout, format);
        let blur_pipeline = fullscreen_pipeline(device, "bloom-blur", &blur_shader, &blur_layout, format);
        let composite_pipeline =
            fullscreen_pipeline(device, "bloom-composite", &composite_shader, &composite_layout, format);

        let high_pass_uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom-high-pass-uniform"),
            contents: bytemuck::bytes_of(&HighPassUniform {
                threshold: settings.threshold,
                smooth_width: SMOOTH_WIDTH,
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let composite_uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom-composite-uniform"),
            contents: bytemuck::bytes_of(&CompositeUniform::new(settings)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let high_pass_target = RenderTexture::new(device, "bloom-high-pass", size, format);
        let high_pass_bind_group = sampled_bind_group(
            device,
            "bloom-high-pass-bind-group",
            &high_pass_layout,
            &high_pass_uniform,
            scene,
            sampler,
        );

        let mut stages: Vec<BlurStage> = Vec::with_capacity(MIP_COUNT * 2);
        for (level, mip) in mip_sizes(size.0, size.1).into_iter().enumerate() {
            let radius = KERNEL_RADII[level];
            for (vertical, direction) in [(false, [1.0, 0.0]), (true, [0.0, 1.0])] {
                let input = match stages.last() {
                    Some(previous) => &previous.target.view,
                    None => &high_pass_target.view,
                };
                let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("bloom-blur-uniform"),
                    contents: bytemuck::bytes_of(&BlurUniform::new(direction, mip, radius)),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = sampled_bind_group(
                    device,
                    "bloom-blur-bind-group",
                    &blur_layout,
                    &uniform,
                    input,
                    sampler,
                );
                let target = RenderTexture::new(device, "bloom-blur", mip, format);
                stages.push(BlurStage {
                    target,
                    _uniform: uniform,
                    bind_group,
                    vertical,
                });
            }
        }

        let output = RenderTexture::new(device, "bloom-output", size, format);
        let composite_bind_group =
            Self::composite_bind_group(device, &composite_layout, &composite_uniform, scene, sampler, &stages);

        Self {
            size,
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            high_pass_layout,
            composite_layout,
            high_pass_uniform,
            composite_uniform,
            high_pass_target,
            high_pass_bind_group,
            stages,
            composite_bind_group,
            output,
        }
    }

    fn composite_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform: &wgpu::Buffer,
        scene: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        stages: &[BlurStage],
    ) -> wgpu::BindGroup {
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(scene),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ];
        // Vertical passes hold each mip's final blur.
        entries.extend(
            stages
                .iter()
                .filter(|stage| stage.vertical)
                .enumerate()
                .map(|(i, stage)| wgpu::BindGroupEntry {
                    binding: 3 + i as u32,
                    resource: wgpu::BindingResource::TextureView(&stage.target.view),
                }),
        );
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom-composite-bind-group"),
            layout,
            entries: &entries,
        })
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        self.size
    }

    pub(crate) fn output(&self) -> &wgpu::TextureView {
        &self.output.view
    }

    /// Rebinds the scene input after the scene target was recreated.
    pub(crate) fn rebind_scene(
        &mut self,
        device: &wgpu::Device,
        scene: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) {
        self.high_pass_bind_group = sampled_bind_group(
            device,
            "bloom-high-pass-bind-group",
            &self.high_pass_layout,
            &self.high_pass_uniform,
            scene,
            sampler,
        );
        self.composite_bind_group = Self::composite_bind_group(
            device,
            &self.composite_layout,
            &self.composite_uniform,
            scene,
            sampler,
            &self.stages,
        );
    }

    pub(crate) fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &BloomSettings,
    ) {
        queue.write_buffer(
            &self.high_pass_uniform,
            0,
            bytemuck::bytes_of(&HighPassUniform {
                threshold: settings.threshold,
                smooth_width: SMOOTH_WIDTH,
                _padding: [0.0; 2],
            }),
        );
        queue.write_buffer(
            &self.composite_uniform,
            0,
            bytemuck::bytes_of(&CompositeUniform::new(settings)),
        );

        draw_fullscreen(
            encoder,
            "bloom-high-pass",
            &self.high_pass_target.view,
            &self.high_pass_pipeline,
            &self.high_pass_bind_group,
        );
        for stage in &self.stages {
            draw_fullscreen(
                encoder,
                "bloom-blur",
                &stage.target.view,
                &self.blur_pipeline,
                &stage.bind_group,
            );
        }
        draw_fullscreen(
            encoder,
            "bloom-composite",
            &self.output.view,
            &self.composite_pipeline,
            &self.composite_bind_group,
        );
    }
}

fn sampled_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    source: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_match_the_shaders() {
        use crate::render::shared::tests::wgsl_struct_size;

        assert_eq!(std::mem::size_of::<BlurUniform>(), 80);
        assert_eq!(wgsl_struct_size(&shared::blur_shader(), "BlurUniform"), 80);
        assert_eq!(
            wgsl_struct_size(&shared::high_pass_shader(), "HighPassUniform") as usize,
            std::mem::size_of::<HighPassUniform>()
        );
        assert_eq!(
            wgsl_struct_size(&shared::composite_shader(), "CompositeUniform") as usize,
            std::mem::size_of::<CompositeUniform>()
        );
    }

    #[test]
    fn factors_move_towards_their_mirror() {
        assert_eq!(lerp_bloom_factor(1.0, 0.0), 1.0);
        assert!((lerp_bloom_factor(1.0, 1.0) - 0.2).abs() < 1e-6);
        assert!((lerp_bloom_factor(0.2, 1.0) - 1.0).abs() < 1e-6);
        assert!((lerp_bloom_factor(0.6, 0.33) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn composite_uses_default_settings() {
        let uniform = CompositeUniform::new(&BloomSettings::new(1280, 720));
        assert_eq!(uniform.strength, 0.5);
        assert!((uniform.factors[0] - (1.0 - 0.8 * 0.33)).abs() < 1e-6);
        assert!((uniform.last_factor - (0.2 + 0.8 * 0.33)).abs() < 1e-6);
    }

    #[test]
    fn mips_halve_down_to_one_pixel() {
        assert_eq!(
            mip_sizes(1280, 720),
            [(640, 360), (320, 180), (160, 90), (80, 45), (40, 22)]
        );
        assert_eq!(mip_sizes(8, 3)[4], (1, 1));
    }

    #[test]
    fn gaussian_weights_fall_off() {
        let weights = gaussian_weights(5);
        assert!(weights[..5].windows(2).all(|pair| pair[0] > pair[1]));
        assert!(weights[5..].iter().all(|w| *w == 0.0));
        assert_eq!(std::mem::size_of::<BlurUniform>(), 80);
    }
}
