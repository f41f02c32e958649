use std::fmt;

use crate::device::DeviceError;

/// Outcome category of a failed operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The batch (or shader) has not been initialised.
    NotInitiated,
    /// Drawing was attempted outside a `begin`/`end` bracket.
    NotBegun,
    ShaderCompileFailed,
    ShaderLinkFailed,
    /// Texture data has a channel count other than 3 (RGB) or 4 (RGBA).
    UnsupportedTextureFormat,
    /// The graphics device reported an error.
    GraphicsDevice,
    /// Shader or texture source could not be read.
    FileRead,
    /// A texture, shader or batch was loaded twice.
    AlreadyLoaded,
    InvalidArgument,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotInitiated => "not initiated",
            ErrorKind::NotBegun => "not begun",
            ErrorKind::ShaderCompileFailed => "shader compile failed",
            ErrorKind::ShaderLinkFailed => "shader link failed",
            ErrorKind::UnsupportedTextureFormat => "unsupported texture format",
            ErrorKind::GraphicsDevice => "graphics device error",
            ErrorKind::FileRead => "file read error",
            ErrorKind::AlreadyLoaded => "already loaded",
            ErrorKind::InvalidArgument => "invalid argument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every fallible batch, shader and texture operation.
///
/// Carries the outcome kind plus a human-readable message. Device failures keep
/// the underlying diagnostic in the message.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Wraps a device diagnostic as a `GraphicsDevice` error.
    pub(crate) fn device(context: impl fmt::Display, err: DeviceError) -> Self {
        Self::new(ErrorKind::GraphicsDevice, format!("{context}: {err}"))
    }

    pub(crate) fn not_initiated(what: &str) -> Self {
        Self::new(ErrorKind::NotInitiated, format!("{what} not initiated"))
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
