use super::context::{GraphicsContext, ShaderStage, UniformValue};
use super::error::{ShaderCompileError, ShaderError, ShaderLinkError};
use super::source::ShaderSources;

/// A linked vertex + fragment program.
///
/// The program handle is owned exclusively by this value. Every operation
/// takes the context that created it; passing a different context is a
/// caller error the type system does not catch.
///
/// There is no `Drop` impl: releasing GPU objects needs the context, so call
/// [`delete`](Self::delete) explicitly, or let the context reclaim the
/// handle when it is destroyed.
#[derive(Debug)]
pub struct ShaderProgram<C: GraphicsContext> {
    program: C::Program,
}

impl<C: GraphicsContext> ShaderProgram<C> {
    /// Compiles both stages and links them.
    ///
    /// The vertex stage is compiled first, so a pair broken in both stages
    /// reports the vertex stage. Intermediate stage objects are released on
    /// every path.
    pub fn new(ctx: &mut C, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vs = ctx
            .compile_stage(ShaderStage::Vertex, vertex)
            .map_err(|log| ShaderCompileError { stage: ShaderStage::Vertex, log })?;

        let fs = match ctx.compile_stage(ShaderStage::Fragment, fragment) {
            Ok(fs) => fs,
            Err(log) => {
                ctx.delete_stage(vs);
                return Err(ShaderCompileError { stage: ShaderStage::Fragment, log }.into());
            }
        };

        let linked = ctx.link_program(&[vs, fs]);
        ctx.delete_stage(vs);
        ctx.delete_stage(fs);

        let program = linked.map_err(|log| ShaderLinkError { log })?;
        log::debug!("linked shader program {program:?}");

        Ok(Self { program })
    }

    pub fn from_sources(ctx: &mut C, sources: &ShaderSources) -> Result<Self, ShaderError> {
        Self::new(ctx, &sources.vertex, &sources.fragment)
    }

    /// Raw program handle, e.g. to compare against `ctx.active_program()`.
    #[inline]
    pub fn handle(&self) -> C::Program {
        self.program
    }

    /// Makes this program the one subsequent draws execute.
    pub fn use_program(&self, ctx: &mut C) {
        ctx.use_program(Some(self.program));
    }

    pub fn is_active(&self, ctx: &C) -> bool {
        ctx.active_program() == Some(self.program)
    }

    pub fn set_bool(&self, ctx: &mut C, name: &str, value: bool) {
        self.set(ctx, name, UniformValue::Bool(value));
    }

    pub fn set_int(&self, ctx: &mut C, name: &str, value: i32) {
        self.set(ctx, name, UniformValue::Int(value));
    }

    pub fn set_float(&self, ctx: &mut C, name: &str, value: f32) {
        self.set(ctx, name, UniformValue::Float(value));
    }

    pub fn set_vec2(&self, ctx: &mut C, name: &str, value: [f32; 2]) {
        self.set(ctx, name, UniformValue::Vec2(value));
    }

    pub fn set_vec3(&self, ctx: &mut C, name: &str, value: [f32; 3]) {
        self.set(ctx, name, UniformValue::Vec3(value));
    }

    pub fn set_vec4(&self, ctx: &mut C, name: &str, value: [f32; 4]) {
        self.set(ctx, name, UniformValue::Vec4(value));
    }

    /// Reads a uniform back through the context. `None` if the name does not
    /// resolve to an active uniform.
    pub fn uniform(&self, ctx: &mut C, name: &str) -> Option<UniformValue> {
        let location = ctx.uniform_location(self.program, name)?;
        ctx.read_uniform(self.program, &location)
    }

    /// Releases the program object.
    pub fn delete(self, ctx: &mut C) {
        ctx.delete_program(self.program);
    }

    // Names that do not resolve are skipped without error; callers set
    // uniforms speculatively across programs that may have optimized them out.
    fn set(&self, ctx: &mut C, name: &str, value: UniformValue) {
        match ctx.uniform_location(self.program, name) {
            Some(location) => ctx.write_uniform(self.program, &location, value),
            None => log::trace!("uniform `{name}` is not active in {:?}; skipped", self.program),
        }
    }
}
