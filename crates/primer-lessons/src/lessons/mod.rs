//! The tutorial programs, one module per lesson.
//!
//! Every lesson is an [`App`] generic over the graphics context: the binary
//! runs it in a window, the tests run it against a `SoftContext`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use primer_engine::gfx::Color;
use primer_engine::window::{Runtime, RuntimeConfig};

mod ebo;
mod shader_class;
mod uniform;
mod vao;
mod vbo;
mod vertex_attributes;
mod window;

pub use ebo::EboLesson;
pub use shader_class::ShaderClassLesson;
pub use uniform::UniformLesson;
pub use vao::VaoLesson;
pub use vbo::VboLesson;
pub use vertex_attributes::VertexAttributesLesson;
pub use window::WindowLesson;

/// Every lesson clears to this before drawing.
pub const CLEAR_COLOR: Color = Color::slate();

/// Vertex stage shared by the single-color lessons.
pub(crate) const POSITION_VS: &str = "#version 330 core
layout (location = 0) in vec3 aPos;

void main()
{
  gl_Position = vec4(aPos.x, aPos.y, aPos.z, 1.0f);
}
";

/// Fragment stage painting everything orange.
pub(crate) const ORANGE_FS: &str = "#version 330 core
out vec4 FragColor;

void main()
{
  FragColor = vec4(1.0f, 0.5f, 0.2f, 1.0f);
}
";

/// The centered triangle of the early lessons.
pub(crate) const TRIANGLE: [f32; 9] = [
    0.0, 0.5, 0.0, //
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0,
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Lesson {
    Window,
    Vbo,
    Vao,
    Ebo,
    Uniform,
    VertexAttributes,
    ShaderClass,
}

impl Lesson {
    pub const ALL: [Lesson; 7] = [
        Lesson::Window,
        Lesson::Vbo,
        Lesson::Vao,
        Lesson::Ebo,
        Lesson::Uniform,
        Lesson::VertexAttributes,
        Lesson::ShaderClass,
    ];

    /// Command-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Lesson::Window => "window",
            Lesson::Vbo => "vbo",
            Lesson::Vao => "vao",
            Lesson::Ebo => "ebo",
            Lesson::Uniform => "uniform",
            Lesson::VertexAttributes => "vertex-attributes",
            Lesson::ShaderClass => "shader-class",
        }
    }

    /// Window title.
    pub const fn title(self) -> &'static str {
        match self {
            Lesson::Window => "GLFW WINDOW",
            Lesson::Vbo | Lesson::Vao => "Triangle",
            Lesson::Ebo => "Two Object, with EBO",
            Lesson::Uniform => "Uniform",
            Lesson::VertexAttributes => "Hello World",
            Lesson::ShaderClass => "Shader Class",
        }
    }

    pub const fn summary(self) -> &'static str {
        match self {
            Lesson::Window => "open a window and clear it every frame",
            Lesson::Vbo => "upload a triangle and link a program, draw nothing yet",
            Lesson::Vao => "draw the triangle through a vertex array",
            Lesson::Ebo => "orange triangle plus a green indexed square",
            Lesson::Uniform => "pulse the triangle green through a vec4 uniform",
            Lesson::VertexAttributes => "interpolate per-vertex colors",
            Lesson::ShaderClass => "load shaders from files and slide the triangle",
        }
    }

    /// Opens the lesson window and runs until it closes.
    pub fn run(self, shader_paths: Option<(PathBuf, PathBuf)>) -> Result<()> {
        if shader_paths.is_some() && self != Lesson::ShaderClass {
            bail!("lesson `{self}` does not take shader paths");
        }

        let config = RuntimeConfig::titled(self.title());
        log::info!("running lesson `{self}`: {}", self.summary());

        match self {
            Lesson::Window => Runtime::run(config, WindowLesson::default()),
            Lesson::Vbo => Runtime::run(config, VboLesson::default()),
            Lesson::Vao => Runtime::run(config, VaoLesson::default()),
            Lesson::Ebo => Runtime::run(config, EboLesson::default()),
            Lesson::Uniform => Runtime::run(config, UniformLesson::default()),
            Lesson::VertexAttributes => Runtime::run(config, VertexAttributesLesson::default()),
            Lesson::ShaderClass => {
                let lesson = match shader_paths {
                    Some((vs, fs)) => ShaderClassLesson::new(vs, fs),
                    None => ShaderClassLesson::default(),
                };
                Runtime::run(config, lesson)
            }
        }
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lesson {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Lesson::ALL
            .into_iter()
            .find(|l| l.name() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown lesson `{s}` (try `list`)"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use primer_engine::core::{App, AppControl, FrameCtx};
    use primer_engine::gfx::SoftContext;
    use primer_engine::time::FrameTime;
    use std::time::Instant;

    /// Runs one frame of `app` at `elapsed` seconds.
    pub fn frame<A: App<SoftContext>>(app: &mut A, ctx: &mut SoftContext, elapsed: f32) -> AppControl {
        let time = FrameTime { dt: 0.0, elapsed, now: Instant::now(), frame_index: 0 };
        let mut frame = FrameCtx::new(ctx, time, (800, 600));
        app.on_frame(&mut frame)
    }

    /// Initializes `app` on a fresh context, asserting setup succeeds.
    pub fn init<A: App<SoftContext>>(app: &mut A) -> SoftContext {
        let mut ctx = SoftContext::new();
        app.init(&mut ctx).unwrap();
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for lesson in Lesson::ALL {
            assert_eq!(lesson.name().parse::<Lesson>().unwrap(), lesson);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "textures".parse::<Lesson>().unwrap_err();
        assert!(err.to_string().contains("unknown lesson `textures`"));
    }

    #[test]
    fn only_shader_class_takes_paths() {
        let paths = Some(("a.vs".into(), "a.fs".into()));
        assert!(Lesson::Vao.run(paths).is_err());
    }
}
