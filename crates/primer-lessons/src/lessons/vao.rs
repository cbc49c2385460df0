use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, VertexLayout};

use super::{CLEAR_COLOR, ORANGE_FS, POSITION_VS, TRIANGLE};

/// Draws the orange triangle: select the program, bind the vertex array, draw.
pub struct VaoLesson<C: GraphicsContext> {
    program: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
}

impl<C: GraphicsContext> Default for VaoLesson<C> {
    fn default() -> Self {
        Self { program: None, triangle: None }
    }
}

impl<C: GraphicsContext> App<C> for VaoLesson<C> {
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

        if let (Some(program), Some(triangle)) = (&self.program, &self.triangle) {
            program.use_program(ctx.gl);
            triangle.draw(ctx.gl);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lessons::testing;

    #[test]
    fn draws_three_vertices_with_the_program() {
        let mut lesson = VaoLesson::default();
        let mut ctx = testing::init(&mut lesson);
        testing::frame(&mut lesson, &mut ctx, 0.0);

        let draws = ctx.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 3);
        assert!(!draws[0].indexed);
        assert!(draws[0].program.is_some());
        assert_eq!(draws[0].program, ctx.active_program());
    }

    #[test]
    fn one_draw_per_frame() {
        let mut lesson = VaoLesson::default();
        let mut ctx = testing::init(&mut lesson);
        for i in 0..3 {
            testing::frame(&mut lesson, &mut ctx, i as f32);
            assert_eq!(ctx.draws().len(), 1);
            ctx.clear_draws();
        }
    }
}
