use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, VertexLayout};

use super::{CLEAR_COLOR, ORANGE_FS, POSITION_VS, TRIANGLE};

/// Uploads the triangle and links a program, but only clears.
///
/// The data sits on the GPU with its attribute layout; drawing it is the
/// next lesson.
pub struct VboLesson<C: GraphicsContext> {
    program: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
}

impl<C: GraphicsContext> Default for VboLesson<C> {
    fn default() -> Self {
        Self { program: None, triangle: None }
    }
}

impl<C: GraphicsContext> App<C> for VboLesson<C> {
    fn init(&mut self, gl: &mut C) -> Result<()> {
        let layout = VertexLayout::new().with(0, 3);
        self.triangle = Some(
            Mesh::new(gl, &TRIANGLE, None, &layout, Primitive::Triangles).context("triangle upload failed")?,
        );
        self.program = Some(ShaderProgram::new(gl, POSITION_VS, ORANGE_FS).context("triangle shaders")?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl {
        ctx.gl.clear(CLEAR_COLOR);
        AppControl::Continue
    }

    fn on_exit(&mut self, gl: &mut C) {
        if let Some(program) = self.program.take() {
            program.delete(gl);
        }
        if let Some(mesh) = self.triangle.take() {
            mesh.delete(gl);
        }
    }
}
