//! Geometry and color types used by the batch API.
//!
//! Pixel space:
//! - origin top-left of the viewport (or texture)
//! - +X right, +Y down
//!
//! The batch converts pixel space to NDC (and texture pixels to UVs) on the CPU
//! while building vertices; shaders receive NDC directly.

mod color;
mod rect;
mod vec2;
mod viewport;

pub use color::Color;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
