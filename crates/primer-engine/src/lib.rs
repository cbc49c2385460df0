//! Primer engine crate.
//!
//! A small shader-program core ([`gfx::ShaderProgram`]) over an explicit
//! graphics context, plus the window runtime the lessons run in.
//!
//! Two contexts implement [`gfx::GraphicsContext`]: [`gfx::GlowContext`]
//! drives a real OpenGL 3.3 core context, and [`gfx::SoftContext`] checks
//! GLSL and records draws without a GPU.

pub mod core;
pub mod device;
pub mod gfx;
pub mod logging;
pub mod time;
pub mod window;
