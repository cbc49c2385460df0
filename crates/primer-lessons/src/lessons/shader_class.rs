use std::path::PathBuf;

use anyhow::{Context, Result};
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::{GraphicsContext, Mesh, Primitive, ShaderProgram, ShaderSources};

use super::vertex_attributes::{colored_layout, COLORED_INDICES, COLORED_TRIANGLE};
use super::CLEAR_COLOR;

const DEFAULT_VS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/shader.vs");
const DEFAULT_FS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/shader.fs");

/// Horizontal offset for `elapsed` seconds, within half a unit either side.
fn offset(elapsed: f32) -> f32 {
    elapsed.sin() * 0.5
}

/// The vertex-color triangle, with shaders read from disk and a float
/// uniform sliding it left and right.
pub struct ShaderClassLesson<C: GraphicsContext> {
    vertex_path: PathBuf,
    fragment_path: PathBuf,
    program: Option<ShaderProgram<C>>,
    triangle: Option<Mesh<C>>,
}

impl<C: GraphicsContext> ShaderClassLesson<C> {
    pub fn new(vertex_path: impl Into<PathBuf>, fragment_path: impl Into<PathBuf>) -> Self {
        Self {
            vertex_path: vertex_path.into(),
            fragment_path: fragment_path.into(),
            program: None,
            triangle: None,
        }
    }
}

impl<C: GraphicsContext> Default for ShaderClassLesson<C> {
    fn default() -> Self {
        Self::new(DEFAULT_VS, DEFAULT_FS)
    }
}

impl<C: GraphicsContext> App<C> for ShaderClassLesson<C> {
    fn init(&mut self, gl: &mut C) -> Result<()> {
        let sources = ShaderSources::load(&self.vertex_path, &self.fragment_path)?;
        let program = ShaderProgram::from_sources(gl, &sources).with_context(|| {
            format!(
                "shaders {} + {}",
                self.vertex_path.display(),
                self.fragment_path.display()
            )
        })?;
        self.program = Some(program);

        self.triangle = Some(
            Mesh::new(gl, &COLORED_TRIANGLE, Some(&COLORED_INDICES), &colored_layout(), Primitive::Triangles)
                .context("colored triangle upload failed")?,
        );
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl {
        ctx.gl.clear(CLEAR_COLOR);

        if let (Some(program), Some(triangle)) = (&self.program, &self.triangle) {
            program.use_program(ctx.gl);
            program.set_float(ctx.gl, "delta", offset(ctx.elapsed()));
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
    use primer_engine::gfx::{SoftContext, UniformValue};

    #[test]
    fn bundled_shaders_link_and_expose_delta() {
        let mut lesson = ShaderClassLesson::default();
        let mut ctx = testing::init(&mut lesson);
        testing::frame(&mut lesson, &mut ctx, 1.0);

        let program = lesson.program.as_ref().unwrap();
        assert_eq!(program.uniform(&mut ctx, "delta"), Some(UniformValue::Float(offset(1.0))));
        assert_eq!(ctx.draws().len(), 1);
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn missing_file_fails_setup_with_its_path() {
        let mut lesson = ShaderClassLesson::new("/nonexistent/lesson.vs", DEFAULT_FS);
        let mut ctx = SoftContext::new();
        let err = lesson.init(&mut ctx).unwrap_err();

        assert!(format!("{err:#}").contains("/nonexistent/lesson.vs"));
        assert_eq!(ctx.program_count(), 0);
        assert!(lesson.triangle.is_none());
    }

    #[test]
    fn broken_shader_file_reports_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.fs");
        std::fs::write(&broken, "#version 330 core\nout vec4 FragColor;\nvoid main() { FragColor = }\n").unwrap();

        let mut lesson = ShaderClassLesson::new(DEFAULT_VS, &broken);
        let mut ctx = SoftContext::new();
        let err = lesson.init(&mut ctx).unwrap_err();
        assert!(format!("{err:#}").contains("fragment shader failed to compile"));
        assert_eq!(ctx.stage_count(), 0);
    }

    #[test]
    fn offset_swings_half_a_unit() {
        assert_eq!(offset(0.0), 0.0);
        assert!((offset(std::f32::consts::FRAC_PI_2) - 0.5).abs() < 1e-6);
    }
}
