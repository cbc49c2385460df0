use crate::gfx::GraphicsContext;
use crate::time::FrameTime;

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a, C: GraphicsContext> {
    pub gl: &'a mut C,
    pub time: FrameTime,
    /// Framebuffer size in physical pixels.
    pub size: (u32, u32),
}

impl<'a, C: GraphicsContext> FrameCtx<'a, C> {
    pub fn new(gl: &'a mut C, time: FrameTime, size: (u32, u32)) -> Self {
        Self { gl, time, size }
    }

    /// Seconds since the clock started.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.time.elapsed
    }
}
