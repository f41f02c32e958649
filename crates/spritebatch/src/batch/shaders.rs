use crate::shader::ShaderSources;

const VERTEX_WGSL: &str = r#"struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) color: vec4<f32>,
    @location(3) tex_index: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) @interpolate(flat) tex_index: f32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.tex_coord = in.tex_coord;
    out.color = in.color;
    out.tex_index = in.tex_index;
    return out;
}
"#;

/// Generates the built-in sprite program for `max_slots` texture slots.
///
/// Slot `i` is bound at `@binding(2i)` (texture) and `@binding(2i + 1)`
/// (sampler). The fragment stage picks the slot from the flat `tex_index`
/// attribute and returns `color * texel`. Sampling uses an explicit LOD since
/// the slot switch is non-uniform control flow.
pub fn sprite_shader_sources(max_slots: u32) -> ShaderSources {
    let mut fragment = String::from(
        "struct FragmentInput {\n    \
         @location(0) tex_coord: vec2<f32>,\n    \
         @location(1) color: vec4<f32>,\n    \
         @location(2) @interpolate(flat) tex_index: f32,\n\
         };\n\n",
    );

    for slot in 0..max_slots {
        fragment.push_str(&format!(
            "@group(0) @binding({}) var texture_{slot}: texture_2d<f32>;\n\
             @group(0) @binding({}) var sampler_{slot}: sampler;\n",
            slot * 2,
            slot * 2 + 1,
        ));
    }

    fragment.push_str("\nfn sample_slot(slot: i32, uv: vec2<f32>) -> vec4<f32> {\n    switch slot {\n");
    for slot in 0..max_slots {
        fragment.push_str(&format!(
            "        case {slot}: {{ return textureSampleLevel(texture_{slot}, sampler_{slot}, uv, 0.0); }}\n"
        ));
    }
    fragment.push_str(
        "        default: { return vec4<f32>(1.0, 1.0, 1.0, 1.0); }\n    \
         }\n\
         }\n\n\
         @fragment\n\
         fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {\n    \
         return in.color * sample_slot(i32(round(in.tex_index)), in.tex_coord);\n\
         }\n",
    );

    ShaderSources::new(VERTEX_WGSL, fragment)
}
