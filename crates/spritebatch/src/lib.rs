//! Batched 2D sprite renderer.
//!
//! Draw requests (textured sprites and flat-colored rects) are accumulated into
//! CPU-side buffers and flushed to the graphics device as few indexed draw calls
//! as possible, packing distinct textures into a bounded set of texture slots.
//!
//! All GPU work goes through the [`device::Device`] capability, which callers
//! pass explicitly into every operation. [`device::Gpu`] implements it on wgpu.

pub mod batch;
pub mod coords;
pub mod device;
pub mod error;
pub mod logging;
pub mod shader;
pub mod texture;

pub use batch::{BatchConfig, BatchStats, SpriteBatch};
pub use coords::{Color, Rect, Vec2, Viewport};
pub use error::{Error, ErrorKind, Result};
pub use shader::{Shader, ShaderSources};
pub use texture::Texture;
