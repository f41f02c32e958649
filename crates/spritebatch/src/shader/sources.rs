use std::path::Path;

use crate::error::{Error, ErrorKind, Result};

/// Vertex and fragment source text of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reads both stages from disk.
    pub fn from_files(vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            vertex: read_source(vertex.as_ref())?,
            fragment: read_source(fragment.as_ref())?,
        })
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::new(
            ErrorKind::FileRead,
            format!("couldn't read shader source \"{}\": {e}", path.display()),
        )
    })
}
