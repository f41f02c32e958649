//! Shader program capability built on [`Device`](crate::device::Device).

mod program;
mod sources;

pub use program::Shader;
pub use sources::ShaderSources;
