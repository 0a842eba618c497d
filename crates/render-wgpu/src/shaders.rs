/// WGSL shader for instanced, lit primitive meshes.
pub const MESH_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    ambient: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_color: vec4<f32>,
    point_position: array<vec4<f32>, 4>,
    point_color: array<vec4<f32>, 4>,
    point_count: vec4<u32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
    @location(7) emissive: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) emissive: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = instance.color;
    out.emissive = instance.emissive;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    var light = uniforms.ambient.rgb;
    light += uniforms.sun_color.rgb * max(dot(n, uniforms.sun_direction.xyz), 0.0);

    for (var i = 0u; i < uniforms.point_count.x; i++) {
        let to_light = uniforms.point_position[i].xyz - in.world_position;
        let dist = max(length(to_light), 0.0001);
        let falloff = clamp(1.0 - dist / uniforms.point_position[i].w, 0.0, 1.0);
        light += uniforms.point_color[i].rgb * max(dot(n, to_light / dist), 0.0) * falloff;
    }

    return vec4<f32>(in.color.rgb * light + in.emissive.rgb, in.color.a);
}
"#;

/// WGSL shader for colored points: the star field and engine trails.
pub const STAR_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    ambient: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_color: vec4<f32>,
    point_position: array<vec4<f32>, 4>,
    point_color: array<vec4<f32>, 4>,
    point_count: vec4<u32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct PointOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_star(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> PointOutput {
    var out: PointOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_star(in: PointOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;
