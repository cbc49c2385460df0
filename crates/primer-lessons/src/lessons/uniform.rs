use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, VertexLayout};

use super::{CLEAR_COLOR, POSITION_VS};

const UNIFORM_FS: &str = "#version 330 core
out vec4 FragColor;

uniform vec4 color;

void main()
{
  FragColor = color;
}
";

const TRIANGLE: [f32; 9] = [
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.0, 0.5, 0.0,
];

/// Green channel for `elapsed` seconds: a sine remapped to `[0, 1]`.
fn pulse(elapsed: f32) -> f32 {
    (elapsed.sin() + 1.0) * 0.5
}

/// A triangle whose color is driven from the CPU each frame.
pub struct UniformLesson<C: GraphicsContext> {
    program: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
}

impl<C: GraphicsContext> Default for UniformLesson<C> {
    fn default() -> Self {
        Self { program: None, triangle: None }
    }
}

impl<C: GraphicsContext> App<C> for UniformLesson<C> {
    fn init(&mut self, gl: &mut C) -> Result<()> {
        let layout = VertexLayout::new().with(0, 3);
        self.triangle = Some(
            Mesh::new(gl, &TRIANGLE, Some(&[0, 1, 2]), &layout, Primitive::Triangles)
                .context("triangle upload failed")?,
        );
        self.program = Some(ShaderProgram::new(gl, POSITION_VS, UNIFORM_FS).context("uniform program")?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl {
        ctx.gl.clear(CLEAR_COLOR);

        if let (Some(program), Some(triangle)) = (&self.program, &self.triangle) {
            let green = pulse(ctx.elapsed());
            program.use_program(ctx.gl);
            program.set_vec4(ctx.gl, "color", [0.0, green, 0.0, 1.0]);
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
