//! Window + runtime loop.
//!
//! Owns the `winit` event loop and drives an [`App`](crate::core::App)
//! against the window's GL context.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
