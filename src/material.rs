use std::sync::Arc;

use glam::Vec2;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Texture resources referenced by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Background,
    Normal,
    Environment,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 3] = [Self::Background, Self::Normal, Self::Environment];

    pub fn label(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Normal => "normal map",
            Self::Environment => "environment map",
        }
    }
}

/// How an environment texture is projected when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mapping {
    /// Plain UV lookup; an environment map in this mode contributes no reflections.
    #[default]
    Uv,
    EquirectangularReflection,
}

/// Physically based transmissive material shared by every shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalMaterial {
    pub roughness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub normal_map: Option<TextureSlot>,
    pub normal_scale: Vec2,
    pub clearcoat_normal_map: Option<TextureSlot>,
    pub clearcoat_normal_scale: Vec2,
    pub env_map: Option<TextureSlot>,
    pub env_mapping: Mapping,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            roughness: 0.6,
            transmission: 1.0,
            thickness: 1.2,
            clearcoat: 1.0,
            clearcoat_roughness: 0.1,
            normal_map: Some(TextureSlot::Normal),
            normal_scale: Vec2::new(1.0, 1.0),
            clearcoat_normal_map: Some(TextureSlot::Normal),
            clearcoat_normal_scale: Vec2::new(0.3, 0.3),
            env_map: Some(TextureSlot::Environment),
            env_mapping: Mapping::Uv,
        }
    }
}

impl PhysicalMaterial {
    /// True once the environment map is tagged for equirectangular reflections.
    pub fn reflects_environment(&self) -> bool {
        self.env_map.is_some() && self.env_mapping == Mapping::EquirectangularReflection
    }
}

/// Handle to the single material instance; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedMaterial {
    inner: Arc<RwLock<PhysicalMaterial>>,
}

impl SharedMaterial {
    pub fn new(material: PhysicalMaterial) -> Self {
        Self {
            inner: Arc::new(RwLock::new(material)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PhysicalMaterial> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PhysicalMaterial> {
        self.inner.write()
    }

    /// Returns a copy of the current parameters.
    pub fn snapshot(&self) -> PhysicalMaterial {
        self.inner.read().clone()
    }

    /// Applies a mutation; the change is visible through every handle.
    pub fn update<R>(&self, updater: impl FnOnce(&mut PhysicalMaterial) -> R) -> R {
        updater(&mut self.inner.write())
    }

    pub fn same_instance(&self, other: &SharedMaterial) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_frosted_glass() {
        let material = PhysicalMaterial::default();
        assert_eq!(material.roughness, 0.6);
        assert_eq!(material.transmission, 1.0);
        assert_eq!(material.thickness, 1.2);
        assert_eq!(material.clearcoat_normal_scale, Vec2::splat(0.3));
        assert!(!material.reflects_environment());
    }

    #[test]
    fn mutation_is_visible_through_every_handle() {
        let material = SharedMaterial::default();
        let other = material.clone();
        material.update(|m| m.roughness = 0.25);
        assert_eq!(other.read().roughness, 0.25);
        assert!(material.same_instance(&other));
        assert!(!material.same_instance(&SharedMaterial::default()));
    }
}
