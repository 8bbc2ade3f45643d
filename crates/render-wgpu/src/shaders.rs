use orrery_render::ShaderSources;

/// Geometry vertex program: object to clip space plus the attributes the
/// lit pixel program and the auxiliary targets need.
pub const GEOMETRY_VS: &str = r#"
struct GeometryUniforms {
    world: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    world_inv_transpose: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> geometry: GeometryUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec3<f32>,
};

struct SurfaceOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) view_normal: vec3<f32>,
    @location(5) view_depth: f32,
};

@vertex
fn vs_main(vertex: VertexInput) -> SurfaceOutput {
    var out: SurfaceOutput;
    let world_position = geometry.world * vec4<f32>(vertex.position, 1.0);
    let view_position = geometry.view * world_position;
    out.clip_position = geometry.projection * view_position;
    out.world_position = world_position.xyz;
    out.normal = normalize((geometry.world_inv_transpose * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.tangent = normalize((geometry.world * vec4<f32>(vertex.tangent, 0.0)).xyz);
    out.uv = vertex.uv;
    out.view_normal = (geometry.view * vec4<f32>(out.normal, 0.0)).xyz;
    out.view_depth = view_position.z;
    return out;
}
"#;

/// Lit pixel program: ambient plus Lambert/Phong per active light, written
/// to the color, normal and depth targets.
pub const LIT_PS: &str = r#"
const MAX_LIGHTS: u32 = 8u;
const KIND_DIRECTIONAL: i32 = 0;
const KIND_POINT: i32 = 1;
const KIND_SPOT: i32 = 2;

struct Light {
    direction: vec3<f32>,
    kind: i32,
    position: vec3<f32>,
    range: f32,
    color: vec3<f32>,
    intensity: f32,
    spot_falloff: f32,
};

struct LitUniforms {
    color_tint: vec3<f32>,
    roughness: f32,
    camera_position: vec3<f32>,
    time: f32,
    ambient: vec3<f32>,
    light_count: i32,
    uv_scale: vec2<f32>,
    uv_offset: vec2<f32>,
    lights: array<Light, 8>,
};

@group(1) @binding(0)
var<uniform> lit: LitUniforms;

@group(2) @binding(0) var albedo: texture_2d<f32>;
@group(2) @binding(1) var normal_map: texture_2d<f32>;
@group(2) @binding(2) var roughness_map: texture_2d<f32>;
@group(2) @binding(3) var surface_sampler: sampler;

struct SurfaceInput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) view_normal: vec3<f32>,
    @location(5) view_depth: f32,
};

struct GBufferOutput {
    @location(0) color: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) depth: f32,
};

fn attenuate(light: Light, distance: f32) -> f32 {
    if light.range <= 0.0 {
        return 0.0;
    }
    let falloff = clamp(1.0 - (distance * distance) / (light.range * light.range), 0.0, 1.0);
    return falloff * falloff;
}

@fragment
fn fs_main(surface: SurfaceInput) -> GBufferOutput {
    let uv = surface.uv * lit.uv_scale + lit.uv_offset;
    let albedo_sample = textureSample(albedo, surface_sampler, uv).rgb;
    let roughness_sample = textureSample(roughness_map, surface_sampler, uv).r;
    let packed_normal = textureSample(normal_map, surface_sampler, uv).rgb * 2.0 - 1.0;

    let n = normalize(surface.normal);
    let t = normalize(surface.tangent - n * dot(surface.tangent, n));
    let b = cross(n, t);
    let normal = normalize(mat3x3<f32>(t, b, n) * packed_normal);

    let base = albedo_sample * lit.color_tint;
    let to_camera = normalize(lit.camera_position - surface.world_position);
    let roughness = clamp(lit.roughness * roughness_sample, 0.0, 1.0);
    let exponent = 64.0 * (1.0 - roughness);

    var color = lit.ambient * base;
    let count = min(u32(max(lit.light_count, 0)), MAX_LIGHTS);
    for (var i = 0u; i < count; i++) {
        let light = lit.lights[i];
        if light.intensity <= 0.0 {
            continue;
        }
        let direction = normalize(light.direction);
        var to_light = -direction;
        var strength = 1.0;
        if light.kind == KIND_POINT || light.kind == KIND_SPOT {
            let light_vector = light.position - surface.world_position;
            to_light = normalize(light_vector);
            strength = attenuate(light, length(light_vector));
            if light.kind == KIND_SPOT {
                strength *= pow(max(dot(-to_light, direction), 0.0), light.spot_falloff);
            }
        } else if light.kind != KIND_DIRECTIONAL {
            continue;
        }

        let diffuse = max(dot(normal, to_light), 0.0);
        var specular = 0.0;
        if diffuse > 0.0 {
            let reflected = reflect(-to_light, normal);
            specular = pow(max(dot(reflected, to_camera), 0.0), exponent) * (1.0 - roughness);
        }
        color += (base * diffuse + vec3<f32>(specular)) * light.color * light.intensity * strength;
    }

    var out: GBufferOutput;
    out.color = vec4<f32>(color, 1.0);
    out.normal = vec4<f32>(normalize(surface.view_normal), 0.0);
    out.depth = surface.view_depth;
    return out;
}
"#;

/// Sky vertex program: a cube around the camera pinned to the far plane.
pub const SKY_VS: &str = r#"
struct SkyUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> sky: SkyUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_sky(vertex: VertexInput) -> SkyOutput {
    var rotation = sky.view;
    rotation[3] = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    let clip = sky.projection * rotation * vec4<f32>(vertex.position, 1.0);

    var out: SkyOutput;
    out.clip_position = clip.xyww;
    out.direction = vertex.position;
    return out;
}
"#;

/// Sky pixel program: vertical gradient between ground, horizon and zenith.
pub const SKY_PS: &str = r#"
const SKY_DEPTH: f32 = 1.0e4;

struct SkyColors {
    zenith_color: vec3<f32>,
    horizon_color: vec3<f32>,
    ground_color: vec3<f32>,
};

@group(1) @binding(0)
var<uniform> colors: SkyColors;

struct SkyInput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

struct GBufferOutput {
    @location(0) color: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) depth: f32,
};

@fragment
fn fs_sky(input: SkyInput) -> GBufferOutput {
    let d = normalize(input.direction);
    var color: vec3<f32>;
    if d.y >= 0.0 {
        color = mix(colors.horizon_color, colors.zenith_color, sqrt(d.y));
    } else {
        color = mix(colors.horizon_color, colors.ground_color, sqrt(-d.y));
    }

    var out: GBufferOutput;
    out.color = vec4<f32>(color, 1.0);
    out.normal = vec4<f32>(0.0, 0.0, -1.0, 0.0);
    out.depth = SKY_DEPTH;
    return out;
}
"#;

/// Full-screen triangle generated from the vertex index; no buffers bound.
pub const FULLSCREEN_VS: &str = r#"
struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}
"#;

/// Composite pixel program: darkens the color target where neighbouring
/// normals or depths change sharply.
pub const COMPOSITE_PS: &str = r#"
struct CompositeUniforms {
    inv_width: f32,
    inv_height: f32,
    normal_strength: f32,
    depth_strength: f32,
};

@group(1) @binding(0)
var<uniform> post: CompositeUniforms;

@group(2) @binding(0) var pixels: texture_2d<f32>;
@group(2) @binding(1) var normals: texture_2d<f32>;
@group(2) @binding(2) var depth: texture_2d<f32>;
@group(2) @binding(3) var clamp_sampler: sampler;

struct FullscreenInput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

fn load_depth(texel: vec2<i32>) -> f32 {
    let last = vec2<i32>(textureDimensions(depth)) - vec2<i32>(1);
    return textureLoad(depth, clamp(texel, vec2<i32>(0), last), 0).r;
}

// x: normal difference, y: absolute depth difference.
fn neighbour(uv: vec2<f32>, texel: vec2<i32>, shift: vec2<i32>, center_normal: vec3<f32>, center_depth: f32) -> vec2<f32> {
    let texel_size = vec2<f32>(post.inv_width, post.inv_height);
    let n = textureSampleLevel(normals, clamp_sampler, uv + vec2<f32>(shift) * texel_size, 0.0).xyz;
    let d = load_depth(texel + shift);
    return vec2<f32>(1.0 - dot(center_normal, n), abs(center_depth - d));
}

@fragment
fn fs_composite(input: FullscreenInput) -> @location(0) vec4<f32> {
    let uv = input.uv;
    let texel = vec2<i32>(input.clip_position.xy);
    let color = textureSampleLevel(pixels, clamp_sampler, uv, 0.0).rgb;
    let center_normal = textureSampleLevel(normals, clamp_sampler, uv, 0.0).xyz;
    let center_depth = load_depth(texel);

    let sum = neighbour(uv, texel, vec2<i32>(-1, 0), center_normal, center_depth)
        + neighbour(uv, texel, vec2<i32>(1, 0), center_normal, center_depth)
        + neighbour(uv, texel, vec2<i32>(0, -1), center_normal, center_depth)
        + neighbour(uv, texel, vec2<i32>(0, 1), center_normal, center_depth);
    let normal_edge = sum.x * 0.25;
    let depth_edge = sum.y * 0.25 / max(center_depth, 1.0e-4);
    let edge = clamp(normal_edge * post.normal_strength + depth_edge * post.depth_strength, 0.0, 1.0);
    return vec4<f32>(color * (1.0 - edge), 1.0);
}
"#;

/// WGSL for every standard program.
pub fn sources() -> ShaderSources {
    ShaderSources {
        geometry_vertex: GEOMETRY_VS,
        lit_pixel: LIT_PS,
        sky_vertex: SKY_VS,
        sky_pixel: SKY_PS,
        fullscreen_vertex: FULLSCREEN_VS,
        composite_pixel: COMPOSITE_PS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_render::RecordingDevice;
    use orrery_render::shader::{ResourceKind, ShaderStage};
    use orrery_render::{ShaderProgram, StandardPrograms};

    fn parse(program: &ShaderProgram) -> naga::Module {
        let module = naga::front::wgsl::parse_str(&program.desc().source)
            .unwrap_or_else(|e| panic!("{}: {}", program.label(), e.emit_to_string(&program.desc().source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{}: {e:?}", program.label()));
        module
    }

    fn programs() -> StandardPrograms {
        let mut device = RecordingDevice::new(16, 16);
        StandardPrograms::create(&mut device, &sources()).unwrap()
    }

    fn all(programs: &StandardPrograms) -> [&ShaderProgram; 6] {
        [
            &*programs.geometry_vertex,
            &*programs.lit_pixel,
            &*programs.sky_vertex,
            &*programs.sky_pixel,
            &*programs.fullscreen_vertex,
            &*programs.composite_pixel,
        ]
    }

    #[test]
    fn every_program_validates_with_its_entry_point() {
        let programs = programs();
        for program in all(&programs) {
            let module = parse(program);
            let stage = match program.stage() {
                ShaderStage::Vertex => naga::ShaderStage::Vertex,
                ShaderStage::Pixel => naga::ShaderStage::Fragment,
            };
            assert!(
                module
                    .entry_points
                    .iter()
                    .any(|ep| ep.name == program.desc().entry_point && ep.stage == stage),
                "{} has no {:?} entry point {}",
                program.label(),
                stage,
                program.desc().entry_point
            );
        }
    }

    #[test]
    fn uniform_structs_match_cpu_layouts() {
        let programs = programs();
        for program in all(&programs) {
            let module = parse(program);
            let uniforms: Vec<_> = module
                .global_variables
                .iter()
                .filter(|(_, var)| var.space == naga::AddressSpace::Uniform)
                .collect();
            let layout = &program.desc().uniforms;
            if layout.fields().is_empty() {
                assert!(uniforms.is_empty(), "{}", program.label());
                continue;
            }
            assert_eq!(uniforms.len(), 1, "{}", program.label());

            let (_, var) = uniforms[0];
            let group = match program.stage() {
                ShaderStage::Vertex => 0,
                ShaderStage::Pixel => 1,
            };
            assert_eq!(var.binding.as_ref().unwrap().group, group);

            let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
                panic!("{}: uniform is not a struct", program.label());
            };
            assert_eq!(*span, layout.size(), "{} size", program.label());
            assert_eq!(members.len(), layout.fields().len(), "{}", program.label());
            for member in members {
                let name = member.name.as_deref().unwrap();
                let field = layout
                    .field(name)
                    .unwrap_or_else(|| panic!("{}: no CPU field {name}", program.label()));
                assert_eq!(member.offset, field.offset, "{}.{name}", program.label());
            }
        }
    }

    #[test]
    fn resource_bindings_follow_slot_order() {
        let programs = programs();
        for program in all(&programs) {
            let module = parse(program);
            for (slot, resource) in program.desc().resources.iter().enumerate() {
                let (_, var) = module
                    .global_variables
                    .iter()
                    .find(|(_, var)| var.name.as_deref() == Some(resource.name.as_str()))
                    .unwrap_or_else(|| panic!("{}: missing {}", program.label(), resource.name));
                let binding = var.binding.as_ref().unwrap();
                assert_eq!((binding.group, binding.binding), (2, slot as u32));
                let is_sampler = matches!(module.types[var.ty].inner, naga::TypeInner::Sampler { .. });
                assert_eq!(is_sampler, resource.kind == ResourceKind::Sampler, "{}", resource.name);
            }
        }
    }

    #[test]
    fn light_struct_matches_cpu_stride() {
        let module = parse(&programs().lit_pixel);
        let light = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("Light"))
            .map(|(_, ty)| ty)
            .unwrap();
        let naga::TypeInner::Struct { members, span } = &light.inner else {
            panic!("Light is not a struct");
        };
        assert_eq!(*span, orrery_render::light::LIGHT_STRIDE);
        let offsets: Vec<u32> = members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 28, 32, 44, 48]);
    }
}
