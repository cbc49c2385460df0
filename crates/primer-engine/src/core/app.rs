use anyhow::Result;
use winit::event::WindowEvent;

use super::ctx::FrameCtx;
use crate::gfx::GraphicsContext;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the runtime.
///
/// Generic over the graphics context so the same app runs against a window
/// or against [`SoftContext`](crate::gfx::SoftContext) in tests.
pub trait App<C: GraphicsContext> {
    /// Called once, after the context exists and before the first frame.
    ///
    /// An error here ends the run before any frame is drawn.
    fn init(&mut self, gl: &mut C) -> Result<()>;

    /// Called for window events, before the runtime's own handling.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl;

    /// Called once when the loop ends, while the context is still alive.
    fn on_exit(&mut self, gl: &mut C) {
        let _ = gl;
    }
}
