use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, VertexLayout};

use super::{CLEAR_COLOR, ORANGE_FS, POSITION_VS};

const GREEN_FS: &str = "#version 330 core
out vec4 FragColor;

void main()
{
  FragColor = vec4(0.5f, 1.0f, 0.2f, 1.0f);
}
";

const LEFT_TRIANGLE: [f32; 9] = [
    -0.5, 0.75, 0.0, //
    -0.9, -0.75, 0.0, //
    -0.1, -0.75, 0.0,
];

const RIGHT_SQUARE: [f32; 12] = [
    0.1, -0.4, 0.0, //
    0.1, 0.4, 0.0, //
    0.9, -0.4, 0.0, //
    0.9, 0.4, 0.0,
];

const SQUARE_INDICES: [u32; 6] = [0, 1, 2, 1, 2, 3];

/// Two objects side by side: an orange triangle drawn from its vertices and
/// a green square drawn through an element buffer.
pub struct EboLesson<C: GraphicsContext> {
    orange: Option<ShaderProgram<C>>,
    green: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
    square: Option<Mesh<C>>,
}

impl<C: GraphicsContext> Default for EboLesson<C> {
    fn default() -> Self {
        Self {
            orange: None,
            green: None,
            triangle: None,
            square: None,
        }
    }
}

impl<C: GraphicsContext> App<C> for EboLesson<C> {
    fn init(&mut self, gl: &mut C) -> Result<()> {
        let layout = VertexLayout::new().with(0, 3);

        self.triangle = Some(
            Mesh::new(gl, &LEFT_TRIANGLE, None, &layout, Primitive::Triangles).context("triangle upload failed")?,
        );
        self.square = Some(
            Mesh::new(gl, &RIGHT_SQUARE, Some(&SQUARE_INDICES), &layout, Primitive::Triangles)
                .context("square upload failed")?,
        );

        self.orange = Some(ShaderProgram::new(gl, POSITION_VS, ORANGE_FS).context("orange program")?);
        self.green = Some(ShaderProgram::new(gl, POSITION_VS, GREEN_FS).context("green program")?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl {
        ctx.gl.clear(CLEAR_COLOR);

        if let (Some(program), Some(mesh)) = (&self.orange, &self.triangle) {
            program.use_program(ctx.gl);
            mesh.draw(ctx.gl);
        }
        if let (Some(program), Some(mesh)) = (&self.green, &self.square) {
            program.use_program(ctx.gl);
            mesh.draw(ctx.gl);
        }
        AppControl::Continue
    }

    fn on_exit(&mut self, gl: &mut C) {
        for program in [self.orange.take(), self.green.take()].into_iter().flatten() {
            program.delete(gl);
        }
        for mesh in [self.triangle.take(), self.square.take()].into_iter().flatten() {
            mesh.delete(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lessons::testing;

    #[test]
    fn triangle_then_indexed_square() {
        let mut lesson = EboLesson::default();
        let mut ctx = testing::init(&mut lesson);
        testing::frame(&mut lesson, &mut ctx, 0.0);

        let draws = ctx.draws();
        assert_eq!(draws.len(), 2);

        assert_eq!((draws[0].count, draws[0].indexed), (3, false));
        assert_eq!((draws[1].count, draws[1].indexed), (6, true));
        assert_ne!(draws[0].program, draws[1].program);
        assert_eq!(ctx.mesh_indices(draws[1].vertex_array), Some(&SQUARE_INDICES[..]));
    }

    #[test]
    fn each_object_uses_its_own_program() {
        let mut lesson = EboLesson::default();
        let mut ctx = testing::init(&mut lesson);
        testing::frame(&mut lesson, &mut ctx, 0.0);

        let orange = lesson.orange.as_ref().unwrap().handle();
        let green = lesson.green.as_ref().unwrap().handle();
        assert_eq!(ctx.draws()[0].program, Some(orange));
        assert_eq!(ctx.draws()[1].program, Some(green));
        assert_eq!(ctx.active_program(), Some(green));
    }

    #[test]
    fn exit_leaves_nothing_behind() {
        let mut lesson = EboLesson::default();
        let mut ctx = testing::init(&mut lesson);
        lesson.on_exit(&mut ctx);
        assert_eq!(ctx.program_count(), 0);
        assert_eq!(ctx.mesh_count(), 0);
        assert_eq!(ctx.active_program(), None);
    }
}
