//! Sprite batching engine.
//!
//! Responsibilities:
//! - accumulate textured and flat-colored quads in a fixed-capacity buffer
//! - assign distinct textures to a bounded set of texture slots
//! - flush (upload + one indexed draw) whenever either limit is reached, and on `end`
//!
//! Conventions:
//! - slot 0 always holds an opaque 1×1 white texture; flat-colored quads sample
//!   it ([`FLAT_COLOR_INDEX`]) and the shader multiplies by the vertex color
//! - quads are emitted top-left, top-right, bottom-right, bottom-left

mod geometry;
mod shaders;
mod slots;
mod sprite_batch;
mod vertex;

pub use geometry::GeometryBuffer;
pub use shaders::sprite_shader_sources;
pub use slots::TextureSlots;
pub use sprite_batch::{BatchConfig, BatchStats, SpriteBatch, DEFAULT_MAX_SPRITES, MAX_SPRITES};
pub use vertex::{quad, Vertex, FLAT_COLOR_INDEX};
