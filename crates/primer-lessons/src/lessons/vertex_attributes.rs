use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, VertexLayout};

use super::CLEAR_COLOR;

const COLOR_VS: &str = "#version 330 core
layout (location = 0) in vec3 position;
layout (location = 1) in vec3 aColor;

out vec3 vertexColor;

void main()
{
  gl_Position = vec4(position, 1.0f);
  vertexColor = aColor;
}
";

const COLOR_FS: &str = "#version 330 core
in vec3 vertexColor;
out vec4 FragColor;

void main()
{
  FragColor = vec4(vertexColor, 1.0f);
}
";

/// Interleaved position and color, one primary per corner.
pub(crate) const COLORED_TRIANGLE: [f32; 18] = [
    -0.5, -0.5, 0.0, 1.0, 0.0, 0.0, //
    0.5, -0.5, 0.0, 0.0, 1.0, 0.0, //
    0.0, 0.5, 0.0, 0.0, 0.0, 1.0,
];

pub(crate) const COLORED_INDICES: [u32; 3] = [0, 1, 2];

/// Position at location 0, color at location 1, three floats each.
pub(crate) fn colored_layout() -> VertexLayout {
    VertexLayout::new().with(0, 3).with(1, 3)
}

/// A triangle colored per vertex; the rasterizer interpolates between corners.
pub struct VertexAttributesLesson<C: GraphicsContext> {
    program: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
}

impl<C: GraphicsContext> Default for VertexAttributesLesson<C> {
    fn default() -> Self {
        Self { program: None, triangle: None }
    }
}

impl<C: GraphicsContext> App<C> for VertexAttributesLesson<C> {
    fn init(&mut self, gl: &mut C) -> Result<()> {
        self.triangle = Some(
            Mesh::new(gl, &COLORED_TRIANGLE, Some(&COLORED_INDICES), &colored_layout(), Primitive::Triangles)
                .context("colored triangle upload failed")?,
        );
        self.program = Some(ShaderProgram::new(gl, COLOR_VS, COLOR_FS).context("vertex color program")?);
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
