use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::context::AppContext;
use crate::geometry::GeometryDescriptor;
use crate::material::{SharedMaterial, TextureSlot};

/// The four shapes of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Icosahedron,
    RoundedBox,
    Knot,
    Torus,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [Self::Icosahedron, Self::RoundedBox, Self::Knot, Self::Torus];

    pub fn name(self) -> &'static str {
        match self {
            Self::Icosahedron => "icosahedron",
            Self::RoundedBox => "roundedRect",
            Self::Knot => "knot",
            Self::Torus => "torus",
        }
    }

    pub fn geometry(self) -> GeometryDescriptor {
        match self {
            Self::Icosahedron => GeometryDescriptor::Icosahedron {
                radius: 0.8,
                detail: 0,
            },
            Self::RoundedBox => GeometryDescriptor::RoundedBox {
                width: 1.15,
                height: 1.15,
                depth: 1.15,
                segments: 16,
                radius: 0.2,
            },
            Self::Knot => GeometryDescriptor::TorusKnot {
                radius: 0.4,
                tube: 0.15,
                tubular_segments: 100,
                radial_segments: 32,
                p: 2,
                q: 3,
            },
            Self::Torus => GeometryDescriptor::Torus {
                radius: 0.55,
                tube: 0.24,
                radial_segments: 16,
                tubular_segments: 100,
            },
        }
    }

    /// Cell of the 2×2 grid the shape sits in.
    pub fn position(self) -> Vec3 {
        const OFFSET: f32 = 0.85;
        match self {
            Self::Icosahedron => Vec3::new(-OFFSET, OFFSET, 0.0),
            Self::RoundedBox => Vec3::new(OFFSET, OFFSET, 0.0),
            Self::Knot => Vec3::new(-OFFSET, -OFFSET, 0.0),
            Self::Torus => Vec3::new(OFFSET, -OFFSET, 0.0),
        }
    }
}

/// One rotating shape rendered with the shared glass material.
#[derive(Debug, Clone)]
pub struct ShapeEntity {
    pub kind: ShapeKind,
    pub geometry: GeometryDescriptor,
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
    material: SharedMaterial,
}

impl ShapeEntity {
    pub fn new(kind: ShapeKind, material: SharedMaterial) -> Self {
        Self {
            kind,
            geometry: kind.geometry(),
            position: kind.position(),
            rotation: Vec3::ZERO,
            material,
        }
    }

    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn model_matrix(&self) -> Mat4 {
        model_matrix(self.position, self.rotation)
    }
}

/// Unlit textured quad behind the shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundPlane {
    pub geometry: GeometryDescriptor,
    pub position: Vec3,
    pub texture: TextureSlot,
}

impl BackgroundPlane {
    pub fn model_matrix(&self) -> Mat4 {
        model_matrix(self.position, Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the scene towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }
}

/// Scene container: camera, light, background and the four shapes.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: PerspectiveCamera,
    pub light: DirectionalLight,
    pub background: BackgroundPlane,
    pub shapes: Vec<ShapeEntity>,
    /// Linear RGB clear colour.
    pub clear_color: Vec3,
    material: SharedMaterial,
}

impl Scene {
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn shape(&self, kind: ShapeKind) -> Option<&ShapeEntity> {
        self.shapes.iter().find(|shape| shape.kind == kind)
    }
}

/// Assembles the demo scene from the application context.
pub struct SceneBuilder;

impl SceneBuilder {
    pub const CAMERA_FOV: f32 = 35.0;
    pub const CAMERA_NEAR: f32 = 0.1;
    pub const CAMERA_FAR: f32 = 100.0;
    pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 8.0);
    pub const LIGHT_COLOR: u32 = 0xfff0dd;
    pub const CLEAR_COLOR: u32 = 0x1f1e1c;

    pub fn build(context: &AppContext) -> Scene {
        let mut camera = PerspectiveCamera::new(
            Self::CAMERA_FOV,
            context.viewport.aspect(),
            Self::CAMERA_NEAR,
            Self::CAMERA_FAR,
        );
        camera.position = Self::CAMERA_POSITION;
        camera.look_at(Vec3::ZERO);

        let background = BackgroundPlane {
            geometry: GeometryDescriptor::Plane {
                width: 5.0,
                height: 5.0,
            },
            position: Vec3::new(0.0, 0.0, -1.0),
            texture: TextureSlot::Background,
        };

        // The material lives in the context and is created before any shape.
        let material = context.material.clone();
        let shapes = ShapeKind::ALL
            .into_iter()
            .map(|kind| ShapeEntity::new(kind, material.clone()))
            .collect();

        let light = DirectionalLight {
            color: hex_to_linear(Self::LIGHT_COLOR),
            intensity: 1.0,
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
        };

        Scene {
            camera,
            light,
            background,
            shapes,
            clear_color: hex_to_linear(Self::CLEAR_COLOR),
            material,
        }
    }

    /// Orbit controls for the scene camera, with damping on.
    pub fn controls(scene: &Scene) -> OrbitControls {
        let mut controls = OrbitControls::new(&scene.camera);
        controls.enable_damping = true;
        controls
    }
}

fn model_matrix(position: Vec3, rotation: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    Mat4::from_rotation_translation(rotation, position)
}

/// Converts a 0xRRGGBB sRGB colour to linear RGB.
pub fn hex_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn build() -> (AppContext, Scene) {
        let context = AppContext::headless(SessionConfig::default());
        let scene = SceneBuilder::build(&context);
        (context, scene)
    }

    #[test]
    fn builds_four_shapes_in_a_grid() {
        let (_, scene) = build();
        assert_eq!(scene.shapes.len(), 4);
        let kinds: Vec<_> = scene.shapes.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, ShapeKind::ALL.to_vec());
        for shape in &scene.shapes {
            assert_eq!(shape.position.x.abs(), 0.85);
            assert_eq!(shape.position.y.abs(), 0.85);
            assert_eq!(shape.position.z, 0.0);
            assert_eq!(shape.rotation, Vec3::ZERO);
        }
        let ico = scene.shape(ShapeKind::Icosahedron).unwrap();
        assert_eq!(ico.position, Vec3::new(-0.85, 0.85, 0.0));
        assert_eq!(ShapeKind::RoundedBox.name(), "roundedRect");
    }

    #[test]
    fn shapes_share_the_context_material() {
        let (context, scene) = build();
        for shape in &scene.shapes {
            assert!(shape.material().same_instance(&context.material));
            assert!(shape.material().same_instance(scene.material()));
        }
        context.material.update(|m| m.thickness = 3.0);
        assert!(scene.shapes.iter().all(|s| s.material().read().thickness == 3.0));
    }

    #[test]
    fn camera_light_and_background_are_fixed() {
        let (context, scene) = build();
        assert_eq!(scene.camera.fov, 35.0);
        assert_eq!(scene.camera.near, 0.1);
        assert_eq!(scene.camera.far, 100.0);
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, 8.0));
        assert_eq!(scene.camera.target, Vec3::ZERO);
        assert_eq!(scene.camera.aspect, context.viewport.aspect());
        assert_eq!(scene.background.position, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(scene.light.position, Vec3::new(0.0, 5.0, 10.0));
        assert_eq!(scene.light.intensity, 1.0);
        assert!((scene.light.direction().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn controls_are_damped_around_the_origin() {
        let (_, scene) = build();
        let controls = SceneBuilder::controls(&scene);
        assert!(controls.enable_damping);
        assert_eq!(controls.damping_factor, 0.05);
        assert_eq!(controls.target, Vec3::ZERO);
    }

    #[test]
    fn model_matrix_applies_rotation_then_translation() {
        let (_, mut scene) = build();
        let shape = &mut scene.shapes[0];
        shape.rotation = Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let moved = shape.model_matrix().transform_point3(Vec3::X);
        assert!((moved - (shape.position + Vec3::NEG_Z)).length() < 1e-5);
    }

    #[test]
    fn hex_colours_convert_to_linear() {
        assert!((hex_to_linear(0xffffff) - Vec3::ONE).length() < 1e-5);
        assert_eq!(hex_to_linear(0x000000), Vec3::ZERO);
        let warm = hex_to_linear(SceneBuilder::LIGHT_COLOR);
        assert!(warm.x > warm.y && warm.y > warm.z);
    }
}
