/// Full-screen triangle sampling the gradient image.
pub const BACKGROUND_SHADER: &str = r#"
@group(0) @binding(0)
var background_texture: texture_2d<f32>;
@group(0) @binding(1)
var background_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(background_texture, background_sampler, input.uv);
}
"#;

/// Depth-only pass from the spotlight.
pub const SHADOW_SHADER: &str = r#"
struct ShadowGlobals {
    light_view_proj: mat4x4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    material: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> shadow: ShadowGlobals;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return shadow.light_view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

/// Metallic-roughness shading lit by one ambient and one spot light.
pub const SCENE_SHADER: &str = r#"
const RECIPROCAL_PI: f32 = 0.3183098861837907;

struct Globals {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    // xyz position, w cut-off distance
    spot_position: vec4<f32>,
    // xyz direction, w decay
    spot_direction: vec4<f32>,
    spot_color: vec4<f32>,
    // cos outer, cos inner, shadows enabled, depth bias
    spot_cone: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    // metalness, roughness, receives shadows
    material: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;
@group(0) @binding(1)
var shadow_map: texture_depth_2d;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    return out;
}

fn distance_attenuation(light_distance: f32, cutoff: f32, decay: f32) -> f32 {
    var falloff = 1.0 / max(pow(light_distance, decay), 0.01);
    if (cutoff > 0.0) {
        let ratio = light_distance / cutoff;
        let window = clamp(1.0 - ratio * ratio * ratio * ratio, 0.0, 1.0);
        falloff = falloff * window * window;
    }
    return falloff;
}

fn d_ggx(alpha: f32, dot_nh: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = dot_nh * dot_nh * (a2 - 1.0) + 1.0;
    return RECIPROCAL_PI * a2 / (denom * denom);
}

fn v_smith_correlated(alpha: f32, dot_nl: f32, dot_nv: f32) -> f32 {
    let a2 = alpha * alpha;
    let gv = dot_nl * sqrt(a2 + (1.0 - a2) * dot_nv * dot_nv);
    let gl = dot_nv * sqrt(a2 + (1.0 - a2) * dot_nl * dot_nl);
    return 0.5 / max(gv + gl, 1e-6);
}

fn f_schlick(f0: vec3<f32>, dot_vh: f32) -> vec3<f32> {
    let fresnel = exp2((-5.55473 * dot_vh - 6.98316) * dot_vh);
    return f0 * (1.0 - fresnel) + vec3<f32>(fresnel);
}

fn shadow_factor(world_pos: vec3<f32>) -> f32 {
    let clip = globals.light_view_proj * vec4<f32>(world_pos, 1.0);
    if (clip.w <= 0.0) {
        return 1.0;
    }
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - globals.spot_cone.w);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);

    let base = object.color.rgb;
    let metalness = object.material.x;
    let roughness = max(object.material.y, 0.0525);
    let diffuse_color = base * (1.0 - metalness);
    let specular_color = mix(vec3<f32>(0.04), base, metalness);
    let alpha = roughness * roughness;

    var color = globals.ambient.rgb * diffuse_color * RECIPROCAL_PI;

    let to_light = globals.spot_position.xyz - input.world_pos;
    let light_distance = length(to_light);
    let light_dir = to_light / max(light_distance, 1e-5);
    let angle_cos = dot(light_dir, -globals.spot_direction.xyz);
    let spot = smoothstep(globals.spot_cone.x, globals.spot_cone.y, angle_cos);

    if (spot > 0.0) {
        var light_color = globals.spot_color.rgb * spot
            * distance_attenuation(light_distance, globals.spot_position.w, globals.spot_direction.w);
        if (globals.spot_cone.z > 0.5 && object.material.z > 0.5) {
            light_color = light_color * shadow_factor(input.world_pos);
        }

        let dot_nl = clamp(dot(normal, light_dir), 0.0, 1.0);
        let half_dir = normalize(light_dir + view_dir);
        let dot_nv = clamp(dot(normal, view_dir), 0.0, 1.0);
        let dot_nh = clamp(dot(normal, half_dir), 0.0, 1.0);
        let dot_vh = clamp(dot(view_dir, half_dir), 0.0, 1.0);

        let specular = f_schlick(specular_color, dot_vh)
            * (v_smith_correlated(alpha, dot_nl, dot_nv) * d_ggx(alpha, dot_nh));
        color = color + light_color * dot_nl * (diffuse_color * RECIPROCAL_PI + specular);
    }

    return vec4<f32>(color, object.color.a);
}
"#;
