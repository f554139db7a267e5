//! WGSL sources shared by the native and web builds.

const MESH_COMMON: &str = r#"
struct FrameUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
    screen: vec4<f32>,
}

struct ObjectUniform {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniform;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = frame.view_proj * world_position;
    out.world_pos = world_position.xyz;
    out.normal = normalize((object.normal * input.normal).xyz);
    out.uv = input.uv;
    return out;
}
"#;

const BACKGROUND_FRAGMENT: &str = r#"
@group(2) @binding(0)
var background_texture: texture_2d<f32>;
@group(2) @binding(1)
var background_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(background_texture, background_sampler, input.uv).rgb, 1.0);
}
"#;

const GLASS_FRAGMENT: &str = r#"
struct GlassUniform {
    roughness: f32,
    transmission: f32,
    thickness: f32,
    ior: f32,
    clearcoat: f32,
    clearcoat_roughness: f32,
    normal_scale: vec2<f32>,
    clearcoat_normal_scale: vec2<f32>,
    normal_repeat: vec2<f32>,
    use_normal_map: f32,
    use_clearcoat_normal_map: f32,
    use_env_map: f32,
    pad0: f32,
}

@group(2) @binding(0)
var<uniform> glass: GlassUniform;
@group(2) @binding(1)
var transmission_texture: texture_2d<f32>;
@group(2) @binding(2)
var clamp_sampler: sampler;
@group(2) @binding(3)
var normal_texture: texture_2d<f32>;
@group(2) @binding(4)
var normal_sampler: sampler;
@group(2) @binding(5)
var env_texture: texture_2d<f32>;

const PI: f32 = 3.14159265;
const BLUR_TAPS: i32 = 12;

fn perturb_normal(q0: vec3<f32>, q1: vec3<f32>, st0: vec2<f32>, st1: vec2<f32>, n: vec3<f32>, map_n: vec3<f32>) -> vec3<f32> {
    let q1perp = cross(q1, n);
    let q0perp = cross(n, q0);
    let t = q1perp * st0.x + q0perp * st1.x;
    let b = q1perp * st0.y + q0perp * st1.y;
    let det = max(dot(t, t), dot(b, b));
    let scale = select(inverseSqrt(det), 0.0, det == 0.0);
    return normalize(t * (map_n.x * scale) + b * (map_n.y * scale) + n * map_n.z);
}

fn fresnel_schlick(f0: f32, cos_theta: f32) -> f32 {
    return f0 + (1.0 - f0) * pow(1.0 - clamp(cos_theta, 0.0, 1.0), 5.0);
}

fn ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let alpha = max(roughness * roughness, 0.002);
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

fn specular(n: vec3<f32>, v: vec3<f32>, l: vec3<f32>, roughness: f32) -> f32 {
    let h = normalize(l + v);
    let n_dot_l = max(dot(n, l), 0.0);
    let visibility = 0.25 / max(max(dot(n, v), 0.0) * n_dot_l, 0.05);
    return ggx(max(dot(n, h), 0.0), roughness) * visibility * n_dot_l;
}

fn equirect_uv(dir: vec3<f32>) -> vec2<f32> {
    let u = atan2(dir.z, dir.x) / (2.0 * PI) + 0.5;
    let v = asin(clamp(dir.y, -1.0, 1.0)) / PI + 0.5;
    return vec2<f32>(u, 1.0 - v);
}

fn sample_transmission(uv: vec2<f32>, roughness: f32) -> vec3<f32> {
    let spread = roughness * roughness * 0.06;
    let aspect = frame.screen.y * frame.screen.z;
    var sum = textureSampleLevel(transmission_texture, clamp_sampler, uv, 0.0).rgb;
    for (var i = 0; i < BLUR_TAPS; i = i + 1) {
        let fi = f32(i) + 0.5;
        let radius = sqrt(fi / f32(BLUR_TAPS)) * spread;
        let angle = fi * 2.39996;
        let offset = vec2<f32>(cos(angle) * aspect, sin(angle)) * radius;
        sum = sum + textureSampleLevel(transmission_texture, clamp_sampler, uv + offset, 0.0).rgb;
    }
    return sum / f32(BLUR_TAPS + 1);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let q0 = dpdx(input.world_pos);
    let q1 = dpdy(input.world_pos);
    let st0 = dpdx(input.uv);
    let st1 = dpdy(input.uv);
    let map_sample = textureSample(normal_texture, normal_sampler, input.uv * glass.normal_repeat).xyz * 2.0 - 1.0;

    let geometric = normalize(input.normal);
    let mapped = perturb_normal(q0, q1, st0, st1, geometric, vec3<f32>(map_sample.xy * glass.normal_scale, map_sample.z));
    let n = normalize(mix(geometric, mapped, glass.use_normal_map));
    let coat_mapped = perturb_normal(q0, q1, st0, st1, geometric, vec3<f32>(map_sample.xy * glass.clearcoat_normal_scale, map_sample.z));
    let coat_n = normalize(mix(geometric, coat_mapped, glass.use_clearcoat_normal_map));

    let v = normalize(frame.camera_position.xyz - input.world_pos);
    let l = normalize(frame.light_direction.xyz);
    let light = frame.light_color.rgb;

    // Refracted exit point projected back to screen space.
    let ray = normalize(refract(-v, n, 1.0 / glass.ior)) * glass.thickness;
    let exit = frame.view_proj * vec4<f32>(input.world_pos + ray, 1.0);
    let ndc = exit.xy / exit.w;
    let refracted_uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let transmitted = sample_transmission(refracted_uv, glass.roughness);

    let n_dot_v = max(dot(n, v), 0.0);
    let fresnel = fresnel_schlick(0.04, n_dot_v);
    let diffuse = vec3<f32>(max(dot(n, l), 0.0)) * light / PI;
    let base = mix(diffuse, transmitted, glass.transmission);

    let reflected = reflect(-v, n);
    let env = textureSampleLevel(env_texture, clamp_sampler, equirect_uv(reflected), 0.0).rgb
        * glass.use_env_map * (1.0 - 0.5 * glass.roughness);

    var color = base * (1.0 - fresnel) + env * fresnel + light * specular(n, v, l, glass.roughness);

    let coat_fresnel = fresnel_schlick(0.04, max(dot(coat_n, v), 0.0)) * glass.clearcoat;
    let coat_env = textureSampleLevel(env_texture, clamp_sampler, equirect_uv(reflect(-v, coat_n)), 0.0).rgb
        * glass.use_env_map;
    let coat = light * specular(coat_n, v, l, glass.clearcoat_roughness) * glass.clearcoat;
    color = color * (1.0 - coat_fresnel) + coat_env * coat_fresnel + coat;

    return vec4<f32>(color, 1.0);
}
"#;

const FULLSCREEN_VERTEX: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    var out: FullscreenOutput;
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}
"#;

const HIGH_PASS_FRAGMENT: &str = r#"
struct HighPassUniform {
    threshold: f32,
    smooth_width: f32,
    pad0: f32,
    pad1: f32,
}

@group(0) @binding(0)
var<uniform> params: HighPassUniform;
@group(0) @binding(1)
var source: texture_2d<f32>;
@group(0) @binding(2)
var source_sampler: sampler;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(source, source_sampler, input.uv);
    let luma = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let alpha = smoothstep(params.threshold, params.threshold + params.smooth_width, luma);
    return mix(vec4<f32>(0.0), texel, alpha);
}
"#;

const BLUR_FRAGMENT: &str = r#"
struct BlurUniform {
    direction: vec2<f32>,
    texel_size: vec2<f32>,
    kernel_radius: f32,
    pad0: f32,
    pad1: f32,
    pad2: f32,
    weights: array<vec4<f32>, 3>,
}

@group(0) @binding(0)
var<uniform> params: BlurUniform;
@group(0) @binding(1)
var source: texture_2d<f32>;
@group(0) @binding(2)
var source_sampler: sampler;

fn weight(i: i32) -> f32 {
    return params.weights[i / 4][i % 4];
}

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    var weight_sum = weight(0);
    var sum = textureSampleLevel(source, source_sampler, input.uv, 0.0).rgb * weight_sum;
    let radius = i32(params.kernel_radius);
    for (var i = 1; i < radius; i = i + 1) {
        let w = weight(i);
        let offset = params.direction * params.texel_size * f32(i);
        let a = textureSampleLevel(source, source_sampler, input.uv + offset, 0.0).rgb;
        let b = textureSampleLevel(source, source_sampler, input.uv - offset, 0.0).rgb;
        sum = sum + (a + b) * w;
        weight_sum = weight_sum + 2.0 * w;
    }
    return vec4<f32>(sum / weight_sum, 1.0);
}
"#;

const COMPOSITE_FRAGMENT: &str = r#"
struct CompositeUniform {
    factors: vec4<f32>,
    last_factor: f32,
    strength: f32,
    pad0: f32,
    pad1: f32,
}

@group(0) @binding(0)
var<uniform> params: CompositeUniform;
@group(0) @binding(1)
var scene_texture: texture_2d<f32>;
@group(0) @binding(2)
var linear_sampler: sampler;
@group(0) @binding(3)
var blur0: texture_2d<f32>;
@group(0) @binding(4)
var blur1: texture_2d<f32>;
@group(0) @binding(5)
var blur2: texture_2d<f32>;
@group(0) @binding(6)
var blur3: texture_2d<f32>;
@group(0) @binding(7)
var blur4: texture_2d<f32>;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let base = textureSample(scene_texture, linear_sampler, input.uv).rgb;
    let glow = params.factors.x * textureSample(blur0, linear_sampler, input.uv).rgb
        + params.factors.y * textureSample(blur1, linear_sampler, input.uv).rgb
        + params.factors.z * textureSample(blur2, linear_sampler, input.uv).rgb
        + params.factors.w * textureSample(blur3, linear_sampler, input.uv).rgb
        + params.last_factor * textureSample(blur4, linear_sampler, input.uv).rgb;
    return vec4<f32>(base + params.strength * glow, 1.0);
}
"#;

const BLIT_FRAGMENT: &str = r#"
struct BlitUniform {
    encode_srgb: f32,
    pad0: f32,
    pad1: f32,
    pad2: f32,
}

@group(0) @binding(0)
var<uniform> params: BlitUniform;
@group(0) @binding(1)
var source: texture_2d<f32>;
@group(0) @binding(2)
var source_sampler: sampler;

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    let low = c * 12.92;
    let high = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3<f32>(0.0031308));
}

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let color = clamp(textureSample(source, source_sampler, input.uv).rgb, vec3<f32>(0.0), vec3<f32>(1.0));
    return vec4<f32>(mix(color, linear_to_srgb(color), params.encode_srgb), 1.0);
}
"#;

pub(crate) fn background_shader() -> String {
    format!("{MESH_COMMON}{BACKGROUND_FRAGMENT}")
}

pub(crate) fn glass_shader() -> String {
    format!("{MESH_COMMON}{GLASS_FRAGMENT}")
}

pub(crate) fn high_pass_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{HIGH_PASS_FRAGMENT}")
}

pub(crate) fn blur_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{BLUR_FRAGMENT}")
}

pub(crate) fn composite_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{COMPOSITE_FRAGMENT}")
}

pub(crate) fn blit_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{BLIT_FRAGMENT}")
}

#[cfg(test)]
pub(crate) mod tests {
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    use super::*;

    fn parse(label: &str, source: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{label}: {}", err.emit_to_string(source)));
        Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .unwrap_or_else(|err| panic!("{label}: {err:?}"));
        module
    }

    /// Byte size of a WGSL struct as laid out by naga.
    pub(crate) fn wgsl_struct_size(source: &str, name: &str) -> u32 {
        let module = parse(name, source);
        let size = module
            .types
            .iter()
            .find_map(|(_, ty)| match &ty.inner {
                naga::TypeInner::Struct { span, .. } if ty.name.as_deref() == Some(name) => {
                    Some(*span)
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("struct {name} not found"));
        size
    }

    #[test]
    fn every_shader_parses_and_validates() {
        let shaders = [
            ("background", background_shader()),
            ("glass", glass_shader()),
            ("high-pass", high_pass_shader()),
            ("blur", blur_shader()),
            ("composite", composite_shader()),
            ("blit", blit_shader()),
        ];
        for (label, source) in &shaders {
            let module = parse(label, source);
            let entry_points: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
            assert!(entry_points.contains(&"fs_main"), "{label}: {entry_points:?}");
            let vertex = if matches!(*label, "background" | "glass") {
                "vs_main"
            } else {
                "vs_fullscreen"
            };
            assert!(entry_points.contains(&vertex), "{label}: {entry_points:?}");
        }
    }
}
