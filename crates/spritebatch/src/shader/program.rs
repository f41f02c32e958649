use std::path::PathBuf;

use crate::device::{Device, ModuleId, ProgramId, ShaderStage};
use crate::error::{Error, ErrorKind, Result};

use super::ShaderSources;

#[derive(Debug, Clone)]
enum Source {
    Inline(ShaderSources),
    Files { vertex: PathBuf, fragment: PathBuf },
}

/// A vertex + fragment program.
///
/// Created unlinked; [`init`](Self::init) compiles and links it on a device.
/// The program belongs to that device and must be released with
/// [`cleanup`](Self::cleanup) on the same device.
#[derive(Debug, Clone)]
pub struct Shader {
    source: Source,
    program: Option<ProgramId>,
}

impl Shader {
    pub fn from_sources(sources: ShaderSources) -> Self {
        Self { source: Source::Inline(sources), program: None }
    }

    /// Sources are read from disk at `init` time.
    pub fn from_files(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Files { vertex: vertex.into(), fragment: fragment.into() },
            program: None,
        }
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.program.is_some()
    }

    #[inline]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Compiles both stages and links them.
    ///
    /// Intermediate modules are released whether or not linking succeeds.
    pub fn init<D: Device + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        if self.program.is_some() {
            return Err(Error::new(ErrorKind::AlreadyLoaded, "shader already initiated"));
        }

        let loaded;
        let sources = match &self.source {
            Source::Inline(s) => s,
            Source::Files { vertex, fragment } => {
                loaded = ShaderSources::from_files(vertex, fragment)?;
                &loaded
            }
        };

        let vs = compile(device, ShaderStage::Vertex, &sources.vertex)?;
        let fs = match compile(device, ShaderStage::Fragment, &sources.fragment) {
            Ok(fs) => fs,
            Err(e) => {
                device.delete_shader(vs);
                return Err(e);
            }
        };

        let linked = device.link_program(vs, fs);
        device.delete_shader(vs);
        device.delete_shader(fs);

        let program = linked.map_err(|e| Error::new(ErrorKind::ShaderLinkFailed, e.to_string()))?;
        self.program = Some(program);
        Ok(())
    }

    /// Makes this program current for subsequent draws.
    pub fn bind<D: Device + ?Sized>(&self, device: &mut D) -> Result<()> {
        let program = self.require_program()?;
        device
            .use_program(program)
            .map_err(|e| Error::device("couldn't bind shader program", e))
    }

    pub fn set_int<D: Device + ?Sized>(&self, device: &mut D, name: &str, value: i32) -> Result<()> {
        let program = self.require_program()?;
        device
            .set_uniform_i32(program, name, value)
            .map_err(|e| Error::device(format!("couldn't set uniform \"{name}\""), e))
    }

    /// Releases the program. Safe to call more than once.
    pub fn cleanup<D: Device + ?Sized>(&mut self, device: &mut D) {
        if let Some(program) = self.program.take() {
            device.delete_program(program);
        }
    }

    fn require_program(&self) -> Result<ProgramId> {
        self.program.ok_or_else(|| Error::not_initiated("shader"))
    }
}

fn compile<D: Device + ?Sized>(
    device: &mut D,
    stage: ShaderStage,
    source: &str,
) -> Result<ModuleId> {
    device.compile_shader(stage, source).map_err(|e| {
        Error::new(ErrorKind::ShaderCompileFailed, format!("{stage} shader: {e}"))
    })
}
