//! Shader programs, meshes and the graphics contexts that back them.

mod color;
mod context;
mod error;
mod gl_context;
mod mesh;
mod program;
mod soft;
mod source;

pub use color::Color;
pub use context::{GraphicsContext, Primitive, ShaderStage, UniformKind, UniformValue};
pub use error::{MeshError, ShaderCompileError, ShaderError, ShaderLinkError};
pub use gl_context::{GlowContext, GlowLocation};
pub use mesh::{Mesh, VertexAttribute, VertexLayout};
pub use program::ShaderProgram;
pub use soft::{DrawCall, GlError, ProgramId, SoftContext, SoftLocation, StageId, VertexArrayId};
pub use source::ShaderSources;
