use anyhow::Result;
use primer_engine::core::{App, AppControl, FrameCtx};
use primer_engine::gfx::GraphicsContext;

use super::CLEAR_COLOR;

/// An empty window cleared every frame.
#[derive(Debug, Default)]
pub struct WindowLesson {
    frames: u64,
}

impl<C: GraphicsContext> App<C> for WindowLesson {
    fn init(&mut self, _gl: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, C>) -> AppControl {
        ctx.gl.clear(CLEAR_COLOR);
        self.frames += 1;
        AppControl::Continue
    }

    fn on_exit(&mut self, _gl: &mut C) {
        log::info!("window closed after {} frames", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lessons::testing;

    #[test]
    fn clears_and_draws_nothing() {
        let mut lesson = WindowLesson::default();
        let mut ctx = testing::init(&mut lesson);
        assert_eq!(testing::frame(&mut lesson, &mut ctx, 0.0), AppControl::Continue);
        assert_eq!(ctx.clear_color(), Some(CLEAR_COLOR));
        assert!(ctx.draws().is_empty());
    }
}
