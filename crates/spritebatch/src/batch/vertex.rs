use bytemuck::{Pod, Zeroable};

use crate::coords::{Color, Vec2};

/// Texture index of flat-colored quads: the reserved white texture in slot 0.
pub const FLAT_COLOR_INDEX: f32 = 0.0;

/// Per-vertex data consumed by the sprite shader.
///
/// Layout (36 bytes):
///
///  offset  0  position       [f32; 2]   loc 0   NDC
///  offset  8  tex_coord      [f32; 2]   loc 1   0..1
///  offset 16  color          [f32; 4]   loc 2   straight RGBA
///  offset 32  texture_index  f32        loc 3   texture slot
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub texture_index: f32,
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // tex_coord
        2 => Float32x4, // color
        3 => Float32    // texture_index
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Builds the four corners of a quad.
///
/// `pos_min`/`uv_min` belong to the top-left corner and `pos_max`/`uv_max` to
/// the bottom-right one. Order: top-left, top-right, bottom-right, bottom-left.
pub fn quad(
    pos_min: Vec2,
    pos_max: Vec2,
    uv_min: Vec2,
    uv_max: Vec2,
    color: Color,
    texture_index: f32,
) -> [Vertex; 4] {
    let color = color.to_array();
    let corner = |px: f32, py: f32, u: f32, v: f32| Vertex {
        position: [px, py],
        tex_coord: [u, v],
        color,
        texture_index,
    };

    [
        corner(pos_min.x, pos_min.y, uv_min.x, uv_min.y),
        corner(pos_max.x, pos_min.y, uv_max.x, uv_min.y),
        corner(pos_max.x, pos_max.y, uv_max.x, uv_max.y),
        corner(pos_min.x, pos_max.y, uv_min.x, uv_max.y),
    ]
}
