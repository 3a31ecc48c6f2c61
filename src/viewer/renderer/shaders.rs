//! Embedded WGSL shaders.
//!
//! `GEM_SHADER` carries the refraction bounce tracer; the rest are the
//! fullscreen passes of the post chain. The BVH structs must stay in
//! sync with `crate::bvh::types` (32-byte nodes, 48-byte triangles).

pub const GEM_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    view_inv: mat4x4<f32>,
    proj_inv: mat4x4<f32>,
    position: vec3<f32>,
    _pad: f32,
}

struct GemParams {
    model: mat4x4<f32>,
    model_inv: mat4x4<f32>,
    color: vec4<f32>,
    ior: vec4<f32>,
    resolution: vec2<f32>,
    bounces: u32,
    correct_mips: u32,
    chromatic: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct BvhNode {
    aabb_min: vec3<f32>,
    left_or_first: u32,
    aabb_max: vec3<f32>,
    count: u32,
}

struct Tri {
    v0: vec4<f32>,
    v1: vec4<f32>,
    v2: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> params: GemParams;
@group(1) @binding(0) var env_map: texture_cube<f32>;
@group(1) @binding(1) var env_sampler: sampler;
@group(1) @binding(2) var<storage, read> nodes: array<BvhNode>;
@group(1) @binding(3) var<storage, read> tris: array<Tri>;

struct VsOut {
    @builtin(position) clip_pos: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    var out: VsOut;
    let world = params.model * vec4<f32>(position, 1.0);
    out.world_pos = world.xyz;
    // model is rotation-only (scale baked at load), so it rotates normals directly
    out.world_normal = (params.model * vec4<f32>(normal, 0.0)).xyz;
    out.clip_pos = camera.view_proj * world;
    return out;
}

const T_MISS: f32 = 1e30;

struct Hit {
    t: f32,
    normal: vec3<f32>,
}

fn tri_hit(i: u32, ro: vec3<f32>, rd: vec3<f32>) -> f32 {
    let v0 = tris[i].v0.xyz;
    let e1 = tris[i].v1.xyz - v0;
    let e2 = tris[i].v2.xyz - v0;
    let p = cross(rd, e2);
    let det = dot(e1, p);
    if (abs(det) < 1e-9) {
        return T_MISS;
    }
    let inv_det = 1.0 / det;
    let s = ro - v0;
    let u = dot(s, p) * inv_det;
    if (u < 0.0 || u > 1.0) {
        return T_MISS;
    }
    let q = cross(s, e1);
    let v = dot(rd, q) * inv_det;
    if (v < 0.0 || u + v > 1.0) {
        return T_MISS;
    }
    let t = dot(e2, q) * inv_det;
    if (t <= 1e-5) {
        return T_MISS;
    }
    return t;
}

fn aabb_entry(bmin: vec3<f32>, bmax: vec3<f32>, ro: vec3<f32>, inv_rd: vec3<f32>, t_best: f32) -> f32 {
    let t0 = (bmin - ro) * inv_rd;
    let t1 = (bmax - ro) * inv_rd;
    let near = max(max(min(t0.x, t1.x), min(t0.y, t1.y)), min(t0.z, t1.z));
    let far = min(min(max(t0.x, t1.x), max(t0.y, t1.y)), max(t0.z, t1.z));
    if (far < max(near, 0.0) || near > t_best) {
        return T_MISS;
    }
    return near;
}

fn bvh_first_hit(ro: vec3<f32>, rd: vec3<f32>) -> Hit {
    var hit: Hit;
    hit.t = T_MISS;
    hit.normal = vec3<f32>(0.0, 0.0, 1.0);

    // Avoid infinities in the slab test for axis-aligned rays
    let safe_rd = select(rd, vec3<f32>(1e-8), abs(rd) < vec3<f32>(1e-8));
    let inv_rd = vec3<f32>(1.0) / safe_rd;

    var stack: array<u32, 48>;
    var sp: i32 = 1;
    stack[0] = 0u;

    while (sp > 0) {
        sp = sp - 1;
        let node = nodes[stack[sp]];
        if (aabb_entry(node.aabb_min, node.aabb_max, ro, inv_rd, hit.t) >= T_MISS) {
            continue;
        }
        if (node.count > 0u) {
            for (var i = 0u; i < node.count; i = i + 1u) {
                let tri_idx = node.left_or_first + i;
                let t = tri_hit(tri_idx, ro, rd);
                if (t < hit.t) {
                    hit.t = t;
                    let tri = tris[tri_idx];
                    hit.normal = normalize(cross(tri.v1.xyz - tri.v0.xyz, tri.v2.xyz - tri.v0.xyz));
                }
            }
        } else {
            let l = node.left_or_first;
            let r = l + 1u;
            let tl = aabb_entry(nodes[l].aabb_min, nodes[l].aabb_max, ro, inv_rd, hit.t);
            let tr = aabb_entry(nodes[r].aabb_min, nodes[r].aabb_max, ro, inv_rd, hit.t);
            // Near child on top of the stack, and never overflow
            if (tl < T_MISS && tr < T_MISS && sp < 46) {
                if (tl <= tr) {
                    stack[sp] = r;
                    stack[sp + 1] = l;
                } else {
                    stack[sp] = l;
                    stack[sp + 1] = r;
                }
                sp = sp + 2;
            } else if (tl < T_MISS && sp < 47) {
                stack[sp] = l;
                sp = sp + 1;
            } else if (tr < T_MISS && sp < 47) {
                stack[sp] = r;
                sp = sp + 1;
            }
        }
    }

    // Report the face normal against the incoming ray
    if (dot(hit.normal, rd) > 0.0) {
        hit.normal = -hit.normal;
    }
    return hit;
}

// Refract into the gem at the shaded point, bounce internally until an
// exit refraction succeeds or the budget runs out, and return the final
// world-space direction. A zero vector from refract() signals total
// internal reflection.
fn trace_gem(entry_pos: vec3<f32>, view_ray: vec3<f32>, normal: vec3<f32>, ior: f32) -> vec3<f32> {
    let entry_dir = refract(view_ray, normal, 1.0 / ior);
    var ro = (params.model_inv * vec4<f32>(entry_pos + entry_dir * 0.001, 1.0)).xyz;
    var rd = normalize((params.model_inv * vec4<f32>(entry_dir, 0.0)).xyz);

    for (var i = 0u; i < params.bounces; i = i + 1u) {
        let hit = bvh_first_hit(ro, rd);
        if (hit.t >= T_MISS) {
            break;
        }
        let hit_pos = ro + rd * max(hit.t - 0.001, 0.0);
        let out_dir = refract(rd, hit.normal, ior);
        if (length(out_dir) != 0.0) {
            rd = out_dir;
            break;
        }
        rd = reflect(rd, hit.normal);
        ro = hit_pos + rd * 0.01;
    }

    return normalize((params.model * vec4<f32>(rd, 0.0)).xyz);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let uv = in.clip_pos.xy / params.resolution;
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    var dir_cam = (camera.proj_inv * vec4<f32>(ndc, 0.0, 1.0)).xyz;
    dir_cam = normalize((camera.view_inv * vec4<f32>(dir_cam, 0.0)).xyz);

    let normal = normalize(in.world_normal);
    let view_ray = normalize(in.world_pos - camera.position);

    var final_color: vec3<f32>;
    if (params.chromatic != 0u) {
        let dir_r = trace_gem(in.world_pos, view_ray, normal, params.ior.x);
        let dir_g = trace_gem(in.world_pos, view_ray, normal, params.ior.y);
        let dir_b = trace_gem(in.world_pos, view_ray, normal, params.ior.z);
        let grad = select(view_ray, dir_cam, params.correct_mips != 0u);
        let gx = dpdx(grad);
        let gy = dpdy(grad);
        let r = textureSampleGrad(env_map, env_sampler, dir_r, gx, gy).r;
        let g = textureSampleGrad(env_map, env_sampler, dir_g, gx, gy).g;
        let b = textureSampleGrad(env_map, env_sampler, dir_b, gx, gy).b;
        final_color = vec3<f32>(r, g, b) * params.color.rgb;
    } else {
        let dir = trace_gem(in.world_pos, view_ray, normal, params.ior.y);
        let grad = select(dir, dir_cam, params.correct_mips != 0u);
        final_color = textureSampleGrad(env_map, env_sampler, dir, dpdx(grad), dpdy(grad)).rgb
            * params.color.rgb;
    }

    return vec4<f32>(final_color, 1.0);
}
"#;

pub const SKY_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    view_inv: mat4x4<f32>,
    proj_inv: mat4x4<f32>,
    position: vec3<f32>,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var env_map: texture_cube<f32>;
@group(1) @binding(1) var env_sampler: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) ndc: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );
    let pos = positions[index];
    var out: VsOut;
    // z = 1 keeps the sky behind everything with LessEqual against a cleared depth
    out.pos = vec4<f32>(pos, 1.0, 1.0);
    out.ndc = pos;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let view_dir = (camera.proj_inv * vec4<f32>(in.ndc, 1.0, 1.0)).xyz;
    let dir = normalize((camera.view_inv * vec4<f32>(view_dir, 0.0)).xyz);
    return vec4<f32>(textureSample(env_map, env_sampler, dir).rgb, 1.0);
}
"#;

/// Shared fullscreen-triangle vertex stage for the post passes.
const FULLSCREEN_VS: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> VsOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );
    let pos = positions[index];
    var out: VsOut;
    out.pos = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 1.0 - (pos.y * 0.5 + 0.5));
    return out;
}
"#;

pub const EFFECT_SHADER_BODY: &str = r#"
@group(0) @binding(0) var scene_diffuse: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;

@fragment
fn fs_effect(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(scene_diffuse, samp, in.uv).rgb, 1.0);
}
"#;

pub const TONEMAP_SHADER_BODY: &str = r#"
@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;

struct ToneMapParams {
    exposure: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}
@group(0) @binding(2) var<uniform> tone: ToneMapParams;

// ACES filmic fit (Stephen Hill), sRGB primaries in and out
const ACES_INPUT = mat3x3<f32>(
    vec3<f32>(0.59719, 0.07600, 0.02840),
    vec3<f32>(0.35458, 0.90834, 0.13383),
    vec3<f32>(0.04823, 0.01566, 0.83777)
);

const ACES_OUTPUT = mat3x3<f32>(
    vec3<f32>(1.60475, -0.10208, -0.00327),
    vec3<f32>(-0.53108, 1.10813, -0.07276),
    vec3<f32>(-0.07367, -0.00605, 1.07602)
);

fn rrt_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

@fragment
fn fs_tonemap(in: VsOut) -> @location(0) vec4<f32> {
    var color = textureSample(src_tex, samp, in.uv).rgb;
    color = color * (tone.exposure / 0.6);
    color = ACES_OUTPUT * rrt_odt_fit(ACES_INPUT * color);
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

pub const GAMMA_SHADER_BODY: &str = r#"
@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    let lo = c * 12.92;
    let hi = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(hi, lo, c <= vec3<f32>(0.0031308));
}

@fragment
fn fs_gamma(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, samp, in.uv).rgb;
    return vec4<f32>(linear_to_srgb(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0))), 1.0);
}
"#;

pub const FXAA_SHADER_BODY: &str = r#"
@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;

struct FxaaParams {
    texel: vec2<f32>,
    _pad: vec2<f32>,
}
@group(0) @binding(2) var<uniform> fxaa: FxaaParams;

const SPAN_MAX: f32 = 8.0;
const REDUCE_MUL: f32 = 1.0 / 8.0;
const REDUCE_MIN: f32 = 1.0 / 128.0;

fn luma(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.299, 0.587, 0.114));
}

@fragment
fn fs_fxaa(in: VsOut) -> @location(0) vec4<f32> {
    let uv = in.uv;
    let rgb_nw = textureSample(src_tex, samp, uv + vec2<f32>(-1.0, -1.0) * fxaa.texel).rgb;
    let rgb_ne = textureSample(src_tex, samp, uv + vec2<f32>(1.0, -1.0) * fxaa.texel).rgb;
    let rgb_sw = textureSample(src_tex, samp, uv + vec2<f32>(-1.0, 1.0) * fxaa.texel).rgb;
    let rgb_se = textureSample(src_tex, samp, uv + vec2<f32>(1.0, 1.0) * fxaa.texel).rgb;
    let rgb_m = textureSample(src_tex, samp, uv).rgb;

    let l_nw = luma(rgb_nw);
    let l_ne = luma(rgb_ne);
    let l_sw = luma(rgb_sw);
    let l_se = luma(rgb_se);
    let l_m = luma(rgb_m);
    let l_min = min(l_m, min(min(l_nw, l_ne), min(l_sw, l_se)));
    let l_max = max(l_m, max(max(l_nw, l_ne), max(l_sw, l_se)));

    var dir = vec2<f32>(
        -((l_nw + l_ne) - (l_sw + l_se)),
        ((l_nw + l_sw) - (l_ne + l_se))
    );

    let dir_reduce = max((l_nw + l_ne + l_sw + l_se) * 0.25 * REDUCE_MUL, REDUCE_MIN);
    let rcp_dir_min = 1.0 / (min(abs(dir.x), abs(dir.y)) + dir_reduce);
    dir = clamp(dir * rcp_dir_min, vec2<f32>(-SPAN_MAX), vec2<f32>(SPAN_MAX)) * fxaa.texel;

    let rgb_a = 0.5 * (
        textureSample(src_tex, samp, uv + dir * (1.0 / 3.0 - 0.5)).rgb +
        textureSample(src_tex, samp, uv + dir * (2.0 / 3.0 - 0.5)).rgb
    );
    let rgb_b = rgb_a * 0.5 + 0.25 * (
        textureSample(src_tex, samp, uv + dir * -0.5).rgb +
        textureSample(src_tex, samp, uv + dir * 0.5).rgb
    );

    let l_b = luma(rgb_b);
    if (l_b < l_min || l_b > l_max) {
        return vec4<f32>(rgb_a, 1.0);
    }
    return vec4<f32>(rgb_b, 1.0);
}
"#;

/// Assemble a fullscreen pass shader from the shared vertex stage.
pub fn fullscreen_shader(body: &str) -> String {
    format!("{FULLSCREEN_VS}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_shaders_contain_both_stages() {
        for body in [
            EFFECT_SHADER_BODY,
            TONEMAP_SHADER_BODY,
            GAMMA_SHADER_BODY,
            FXAA_SHADER_BODY,
        ] {
            let src = fullscreen_shader(body);
            assert!(src.contains("vs_fullscreen"));
            assert!(src.contains("@fragment"));
        }
    }
}
