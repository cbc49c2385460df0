use thiserror::Error;

use super::context::ShaderStage;

/// A single stage was rejected by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} shader failed to compile:\n{log}")]
pub struct ShaderCompileError {
    pub stage: ShaderStage,
    /// Compiler diagnostic, verbatim.
    pub log: String,
}

/// Both stages compiled but the linker rejected the pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shader program failed to link:\n{log}")]
pub struct ShaderLinkError {
    /// Linker diagnostic, verbatim.
    pub log: String,
}

/// Failure while constructing a [`ShaderProgram`](super::ShaderProgram).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderError {
    #[error(transparent)]
    Compile(#[from] ShaderCompileError),
    #[error(transparent)]
    Link(#[from] ShaderLinkError),
}

impl ShaderError {
    /// Stage that failed to compile, `None` for link failures.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            ShaderError::Compile(e) => Some(e.stage),
            ShaderError::Link(_) => None,
        }
    }

    pub fn log(&self) -> &str {
        match self {
            ShaderError::Compile(e) => &e.log,
            ShaderError::Link(e) => &e.log,
        }
    }
}

/// Rejected vertex/index data or a backend allocation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("vertex layout has no attributes")]
    EmptyLayout,
    #[error("attribute at location {location} has {components} components; expected 1 to 4")]
    InvalidComponents { location: u32, components: u8 },
    #[error("attribute location {0} is declared twice")]
    DuplicateLocation(u32),
    #[error("mesh has no vertices")]
    Empty,
    #[error("vertex data holds {len} floats, not a multiple of the {stride}-float stride")]
    Misaligned { len: usize, stride: usize },
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("graphics backend rejected the upload: {0}")]
    Backend(String),
}
