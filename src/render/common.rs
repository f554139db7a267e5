use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2};

use crate::material::PhysicalMaterial;
use crate::scene::Scene;

/// Per-frame camera and lighting state.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Unit vector pointing from the surface towards the light.
    pub light_direction: [f32; 4],
    /// Linear colour premultiplied by intensity.
    pub light_color: [f32; 4],
    /// Buffer width, height and their reciprocals.
    pub screen: [f32; 4],
}

impl FrameUniform {
    pub fn from_scene(scene: &Scene, buffer_size: (u32, u32)) -> Self {
        let (width, height) = (buffer_size.0.max(1) as f32, buffer_size.1.max(1) as f32);
        let light = &scene.light;
        Self {
            view_proj: scene.camera.view_projection().to_cols_array_2d(),
            camera_position: scene.camera.position.extend(1.0).into(),
            light_direction: light.direction().extend(0.0).into(),
            light_color: (light.color * light.intensity).extend(light.intensity).into(),
            screen: [width, height, 1.0 / width, 1.0 / height],
        }
    }
}

/// Model transform of one mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl ObjectUniform {
    pub fn new(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Glass material parameters. Flags are 0.0 or 1.0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlassUniform {
    pub roughness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub normal_scale: [f32; 2],
    pub clearcoat_normal_scale: [f32; 2],
    /// UV repeat of the normal map.
    pub normal_repeat: [f32; 2],
    pub use_normal_map: f32,
    pub use_clearcoat_normal_map: f32,
    pub use_env_map: f32,
    pub _padding: f32,
}

impl GlassUniform {
    pub const IOR: f32 = 1.5;

    /// `normal_repeat` is the loaded normal map's UV repeat, `None` while only
    /// the placeholder is bound. `env_loaded` reports a real environment map.
    pub fn from_material(
        material: &PhysicalMaterial,
        normal_repeat: Option<Vec2>,
        env_loaded: bool,
    ) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let normal_loaded = normal_repeat.is_some();
        Self {
            roughness: material.roughness.clamp(0.0, 1.0),
            transmission: material.transmission.clamp(0.0, 1.0),
            thickness: material.thickness.max(0.0),
            ior: Self::IOR,
            clearcoat: material.clearcoat.clamp(0.0, 1.0),
            clearcoat_roughness: material.clearcoat_roughness.clamp(0.0, 1.0),
            normal_scale: material.normal_scale.into(),
            clearcoat_normal_scale: material.clearcoat_normal_scale.into(),
            normal_repeat: normal_repeat.unwrap_or(Vec2::ONE).into(),
            use_normal_map: flag(material.normal_map.is_some() && normal_loaded),
            use_clearcoat_normal_map: flag(material.clearcoat_normal_map.is_some() && normal_loaded),
            use_env_map: flag(material.reflects_environment() && env_loaded),
            _padding: 0.0,
        }
    }
}

/// Output blit settings.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlitUniform {
    /// 1.0 when the swapchain is not an sRGB format and the shader must encode.
    pub encode_srgb: f32,
    pub _padding: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::context::AppContext;
    use crate::material::Mapping;
    use crate::scene::SceneBuilder;

    #[test]
    fn env_flag_needs_texture_and_equirect_tag() {
        let mut material = PhysicalMaterial::default();
        assert_eq!(GlassUniform::from_material(&material, Some(Vec2::ONE), true).use_env_map, 0.0);
        material.env_mapping = Mapping::EquirectangularReflection;
        assert_eq!(GlassUniform::from_material(&material, Some(Vec2::ONE), false).use_env_map, 0.0);
        assert_eq!(GlassUniform::from_material(&material, Some(Vec2::ONE), true).use_env_map, 1.0);
    }

    #[test]
    fn glass_uniform_carries_material_values() {
        let uniform =
            GlassUniform::from_material(&PhysicalMaterial::default(), Some(Vec2::ONE), false);
        assert_eq!(uniform.roughness, 0.6);
        assert_eq!(uniform.transmission, 1.0);
        assert_eq!(uniform.thickness, 1.2);
        assert_eq!(uniform.clearcoat_normal_scale, [0.3, 0.3]);
        assert_eq!(uniform.use_normal_map, 1.0);
        assert_eq!(std::mem::size_of::<GlassUniform>() % 16, 0);
    }

    #[test]
    fn normal_map_repeat_follows_the_loaded_texture() {
        let material = PhysicalMaterial::default();
        let placeholder = GlassUniform::from_material(&material, None, false);
        assert_eq!(placeholder.use_normal_map, 0.0);
        assert_eq!(placeholder.normal_repeat, [1.0, 1.0]);

        let tiled = GlassUniform::from_material(&material, Some(Vec2::new(2.0, 3.0)), false);
        assert_eq!(tiled.use_normal_map, 1.0);
        assert_eq!(tiled.normal_repeat, [2.0, 3.0]);
    }

    #[test]
    fn uniform_layouts_match_the_shaders() {
        use crate::render::shared::{self, tests::wgsl_struct_size};

        let glass = shared::glass_shader();
        assert_eq!(std::mem::size_of::<GlassUniform>(), 64);
        assert_eq!(wgsl_struct_size(&glass, "GlassUniform"), 64);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 128);
        assert_eq!(wgsl_struct_size(&glass, "FrameUniform"), 128);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 112);
        assert_eq!(wgsl_struct_size(&glass, "ObjectUniform"), 112);
        assert_eq!(
            wgsl_struct_size(&shared::blit_shader(), "BlitUniform") as usize,
            std::mem::size_of::<BlitUniform>()
        );
    }

    #[test]
    fn frame_uniform_points_towards_the_light() {
        let scene = SceneBuilder::build(&AppContext::headless(SessionConfig::default()));
        let uniform = FrameUniform::from_scene(&scene, (1280, 720));
        let direction = glam::Vec3::from_slice(&uniform.light_direction[..3]);
        let expected = (scene.light.position - scene.light.target).normalize();
        assert!((direction - expected).length() < 1e-5);
        assert_eq!(uniform.screen[0], 1280.0);
        assert_eq!(uniform.camera_position, [0.0, 0.0, 8.0, 1.0]);
    }
}
