//! GL display, context and window surface management.
//!
//! This module is responsible for:
//! - creating the window together with a matching framebuffer config
//! - creating a core-profile context and making it current
//! - loading GL entry points into a [`GlowContext`](crate::gfx::GlowContext)

mod gl;
mod init;

pub use gl::GlDevice;
pub use init::GlInit;
