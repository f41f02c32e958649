//! Graphics device capability.
//!
//! Everything the batch needs from the GPU goes through [`Device`]. The device
//! is passed explicitly into each operation, so several batches or devices can
//! coexist and tests can substitute a recording fake.
//!
//! The object model is id-based: the device owns GPU objects and hands out
//! small copyable ids. Ids are only meaningful for the device that created them.
//!
//! - [`Gpu`]: wgpu implementation (headless, renders into a target texture)

mod gpu;
mod init;
#[cfg(test)]
pub(crate) mod recording;

use std::fmt;

use crate::batch::Vertex;

pub use gpu::Gpu;
pub use init::GpuInit;

/// Vertex or index buffer handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

/// Texture handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub u32);

/// Compiled shader module handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ModuleId(pub u32);

/// Linked program handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Texture creation parameters. Pixel data is always tightly packed RGBA8.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

/// Diagnostic reported by a device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    message: String,
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DeviceError {}

/// Low-level graphics operations used by the batch, shader and texture types.
///
/// Calls act on the device's current state (bound program, texture units,
/// render target), mirroring an immediate-mode graphics API. Implementations
/// must report failures instead of panicking; `delete_*` calls are best-effort
/// and ignore unknown ids.
pub trait Device {
    /// Number of texture units a single draw call can sample from.
    fn max_texture_slots(&self) -> u32;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ModuleId>;
    fn link_program(&mut self, vertex: ModuleId, fragment: ModuleId) -> DeviceResult<ProgramId>;
    fn delete_shader(&mut self, module: ModuleId);
    fn delete_program(&mut self, program: ProgramId);

    /// Makes `program` the one used by subsequent draws.
    fn use_program(&mut self, program: ProgramId) -> DeviceResult<()>;
    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32) -> DeviceResult<()>;

    /// Allocates an uninitialised vertex buffer holding `vertex_capacity` vertices.
    fn create_vertex_buffer(&mut self, vertex_capacity: usize) -> DeviceResult<BufferId>;
    fn create_index_buffer(&mut self, indices: &[u32]) -> DeviceResult<BufferId>;
    /// Overwrites the start of `buffer` with `vertices`; the rest is untouched.
    fn write_vertices(&mut self, buffer: BufferId, vertices: &[Vertex]) -> DeviceResult<()>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_texture(&mut self, desc: &TextureDesc, rgba: &[u8]) -> DeviceResult<TextureId>;
    fn delete_texture(&mut self, texture: TextureId);
    /// Activates texture unit `slot` and binds `texture` to it.
    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> DeviceResult<()>;

    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self) -> DeviceResult<()>;

    /// Draws `index_count` indices as a triangle list with the current program
    /// and texture units.
    fn draw_indexed(
        &mut self,
        vertices: BufferId,
        indices: BufferId,
        index_count: u32,
    ) -> DeviceResult<()>;
}
