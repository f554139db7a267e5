use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Interleaved vertex consumed by the GPU renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends a vertex; `uv` uses a bottom-left origin and is flipped for GPU textures.
    fn push(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: [uv.x, 1.0 - uv.y],
        });
        index
    }

    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }
}

/// Parameters of one primitive shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryDescriptor {
    Icosahedron {
        radius: f32,
        detail: u32,
    },
    RoundedBox {
        width: f32,
        height: f32,
        depth: f32,
        segments: u32,
        radius: f32,
    },
    TorusKnot {
        radius: f32,
        tube: f32,
        tubular_segments: u32,
        radial_segments: u32,
        p: u32,
        q: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Plane {
        width: f32,
        height: f32,
    },
}

impl GeometryDescriptor {
    pub fn tessellate(&self) -> MeshData {
        match *self {
            Self::Icosahedron { radius, detail } => icosahedron(radius, detail),
            Self::RoundedBox {
                width,
                height,
                depth,
                segments,
                radius,
            } => rounded_box(width, height, depth, segments, radius),
            Self::TorusKnot {
                radius,
                tube,
                tubular_segments,
                radial_segments,
                p,
                q,
            } => torus_knot(radius, tube, tubular_segments, radial_segments, p, q),
            Self::Torus {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            } => torus(radius, tube, radial_segments, tubular_segments),
            Self::Plane { width, height } => plane(width, height),
        }
    }
}

const ICOSAHEDRON_INDICES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// Flat-shaded icosphere: every triangle owns its three vertices.
fn icosahedron(radius: f32, detail: u32) -> MeshData {
    let corners = icosahedron_corners();
    let mut mesh = MeshData::default();
    for face in ICOSAHEDRON_INDICES {
        let [a, b, c] = face.map(|index| corners[index]);
        for [p0, p1, p2] in subdivide(a, b, c, detail) {
            let [p0, p1, p2] = [p0, p1, p2].map(|p| p.normalize() * radius);
            let mut normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
            let centroid = (p0 + p1 + p2) / 3.0;
            let outward = normal.dot(centroid) >= 0.0;
            if !outward {
                normal = -normal;
            }
            let ids = [p0, p1, p2].map(|p| mesh.push(p, normal, spherical_uv(p)));
            if outward {
                mesh.indices.extend_from_slice(&ids);
            } else {
                mesh.indices.extend_from_slice(&[ids[0], ids[2], ids[1]]);
            }
        }
    }
    mesh
}

fn subdivide(a: Vec3, b: Vec3, c: Vec3, detail: u32) -> Vec<[Vec3; 3]> {
    let cols = detail as usize + 1;
    let mut grid: Vec<Vec<Vec3>> = Vec::with_capacity(cols + 1);
    for i in 0..=cols {
        let t = i as f32 / cols as f32;
        let aj = a.lerp(c, t);
        let bj = b.lerp(c, t);
        let rows = cols - i;
        let row = (0..=rows)
            .map(|j| {
                if rows == 0 {
                    aj
                } else {
                    aj.lerp(bj, j as f32 / rows as f32)
                }
            })
            .collect();
        grid.push(row);
    }

    let mut triangles = Vec::new();
    for i in 0..cols {
        for j in 0..(2 * (cols - i) - 1) {
            let k = j / 2;
            if j % 2 == 0 {
                triangles.push([grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
            } else {
                triangles.push([grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]);
            }
        }
    }
    triangles
}

fn spherical_uv(point: Vec3) -> Vec2 {
    let azimuth = point.z.atan2(-point.x);
    let inclination = (-point.y).atan2((point.x * point.x + point.z * point.z).sqrt());
    Vec2::new(azimuth / TAU + 0.5, inclination / PI + 0.5)
}

fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Box whose edges are rounded by pushing the outer grid rows onto corner spheres.
fn rounded_box(width: f32, height: f32, depth: f32, segments: u32, radius: f32) -> MeshData {
    // An odd segment count keeps one flat strip through the middle of each face.
    let segments = segments.max(1) * 2 + 1;
    let radius = radius.min(width / 2.0).min(height / 2.0).min(depth / 2.0);
    let core = Vec3::new(width, height, depth) / 2.0 - Vec3::splat(radius);
    let half_segment = 0.5 / segments as f32;

    // (normal, right, up) with right × up == normal so faces wind counter-clockwise.
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = MeshData::default();
    let stride = segments + 1;
    for (face_normal, right, up) in faces {
        let base = mesh.vertices.len() as u32;
        for iy in 0..=segments {
            for ix in 0..=segments {
                let s = ix as f32 / segments as f32;
                let t = iy as f32 / segments as f32;
                let cube = face_normal * 0.5 + right * (s - 0.5) + up * (t - 0.5);
                let signs = Vec3::new(sign(cube.x), sign(cube.y), sign(cube.z));
                let normal = (cube - signs * half_segment).normalize();
                let position = core * signs + normal * radius;
                mesh.push(position, normal, Vec2::new(s, t));
            }
        }
        for iy in 0..segments {
            for ix in 0..segments {
                let a = base + iy * stride + ix;
                let b = a + 1;
                let c = a + stride + 1;
                let d = a + stride;
                mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
    }
    mesh
}

fn torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> MeshData {
    let tubular_segments = tubular_segments.max(3);
    let radial_segments = radial_segments.max(3);
    let p = p.max(1) as f32;
    let q = q as f32;
    let curve = |u: f32| {
        let q_over_p = q / p * u;
        let cs = q_over_p.cos();
        Vec3::new(
            radius * (2.0 + cs) * 0.5 * u.cos(),
            radius * (2.0 + cs) * 0.5 * u.sin(),
            radius * q_over_p.sin() * 0.5,
        )
    };

    let mut mesh = MeshData::default();
    for i in 0..=tubular_segments {
        let u = i as f32 / tubular_segments as f32 * p * TAU;
        let p1 = curve(u);
        let p2 = curve(u + 0.01);
        let tangent = p2 - p1;
        let mut normal = p2 + p1;
        let binormal = tangent.cross(normal);
        normal = binormal.cross(tangent);
        let binormal = binormal.normalize();
        let normal = normal.normalize();

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();
            let position = p1 + normal * cx + binormal * cy;
            let surface_normal = (position - p1).normalize();
            mesh.push(
                position,
                surface_normal,
                Vec2::new(
                    i as f32 / tubular_segments as f32,
                    j as f32 / radial_segments as f32,
                ),
            );
        }
    }

    let ring = radial_segments + 1;
    for j in 1..=tubular_segments {
        for i in 1..=radial_segments {
            let a = ring * (j - 1) + (i - 1);
            let b = ring * j + (i - 1);
            let c = ring * j + i;
            let d = ring * (j - 1) + i;
            mesh.quad(a, b, c, d);
        }
    }
    mesh
}

fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let radial_segments = radial_segments.max(2);
    let tubular_segments = tubular_segments.max(3);
    let mut mesh = MeshData::default();
    for j in 0..=radial_segments {
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let v = j as f32 / radial_segments as f32 * TAU;
            let position = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            mesh.push(
                position,
                (position - center).normalize(),
                Vec2::new(
                    i as f32 / tubular_segments as f32,
                    j as f32 / radial_segments as f32,
                ),
            );
        }
    }

    let ring = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = ring * j + i - 1;
            let b = ring * (j - 1) + i - 1;
            let c = ring * (j - 1) + i;
            let d = ring * j + i;
            mesh.quad(a, b, c, d);
        }
    }
    mesh
}

fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let mut mesh = MeshData::default();
    let top_left = mesh.push(Vec3::new(-hw, hh, 0.0), Vec3::Z, Vec2::new(0.0, 1.0));
    let top_right = mesh.push(Vec3::new(hw, hh, 0.0), Vec3::Z, Vec2::new(1.0, 1.0));
    let bottom_left = mesh.push(Vec3::new(-hw, -hh, 0.0), Vec3::Z, Vec2::new(0.0, 0.0));
    let bottom_right = mesh.push(Vec3::new(hw, -hh, 0.0), Vec3::Z, Vec2::new(1.0, 0.0));
    mesh.quad(top_left, bottom_left, bottom_right, top_right);
    mesh
}
