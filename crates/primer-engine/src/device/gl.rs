use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, bail, Context, Result};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

use super::GlInit;
use crate::gfx::{GlowContext, GraphicsContext};

/// Owns the window, its GL surface and context, and the loaded entry points.
///
/// Field order is drop order: GL objects go first, the window last.
pub struct GlDevice {
    /// Loaded entry points for the current context.
    gl: GlowContext,

    /// Context made current on `surface`.
    context: PossiblyCurrentContext,

    /// Default framebuffer of `window`.
    surface: Surface<WindowSurface>,

    window: Window,

    /// Current framebuffer size in physical pixels.
    size: PhysicalSize<u32>,
}

impl GlDevice {
    /// Creates the window and a current GL context bound to it.
    pub fn new(event_loop: &ActiveEventLoop, attributes: WindowAttributes, init: &GlInit) -> Result<Self> {
        let min_samples = init.samples;
        let template = ConfigTemplateBuilder::new().with_alpha_size(8);

        // The picker must hand back a config, so an empty set unwinds out of
        // the builder with a private payload and becomes an error here.
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            DisplayBuilder::new()
                .with_window_attributes(Some(attributes))
                .build(event_loop, template, |configs| {
                    pick_config(configs, min_samples, Config::num_samples)
                        .unwrap_or_else(|| panic::resume_unwind(Box::new(NoMatchingConfig)))
                })
        }));
        let (window, config) = match built {
            Ok(built) => built.map_err(|e| anyhow!("failed to create GL display: {e}"))?,
            Err(payload) if payload.is::<NoMatchingConfig>() => {
                bail!("no framebuffer config with an 8-bit alpha channel is available")
            }
            Err(payload) => panic::resume_unwind(payload),
        };
        let window = window.context("display builder did not create a window")?;

        log::debug!(
            "framebuffer config: {} samples, alpha {}",
            config.num_samples(),
            config.alpha_size()
        );

        let raw_handle = window
            .window_handle()
            .context("window has no native handle")?
            .as_raw();

        let (major, minor) = init.version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_handle));

        let display = config.display();

        // SAFETY: `raw_handle` belongs to `window`, which this value owns and
        // drops after the context.
        let not_current = unsafe { display.create_context(&config, &context_attributes) }
            .with_context(|| format!("failed to create an OpenGL {major}.{minor} core context"))?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .context("failed to describe the window surface")?;

        // SAFETY: same handle ownership as above.
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes) }
            .context("failed to create the window surface")?;

        let context = not_current
            .make_current(&surface)
            .context("failed to make the GL context current")?;

        if init.vsync {
            if let Err(e) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
                log::warn!("vsync unavailable: {e}");
            }
        }

        // SAFETY: the context was made current on this thread just above.
        let gl = unsafe { glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name)) };
        let mut gl = GlowContext::new(gl);

        let size = window.inner_size();
        gl.set_viewport(size.width, size.height);

        Ok(Self {
            gl,
            context,
            surface,
            window,
            size,
        })
    }

    #[inline]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[inline]
    pub fn gl_mut(&mut self) -> &mut GlowContext {
        &mut self.gl
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the surface and the viewport. Zero sizes (minimized) are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        self.surface.resize(&self.context, width, height);
        self.gl.set_viewport(size.width, size.height);
        self.size = size;
    }

    /// Swaps the back buffer to the window.
    pub fn present(&self) -> Result<()> {
        self.window.pre_present_notify();
        self.surface
            .swap_buffers(&self.context)
            .context("failed to swap buffers")
    }
}

/// Unwind payload for an empty framebuffer config set.
struct NoMatchingConfig;

/// Prefers configs with at least `min_samples`, then the fewest samples.
fn pick_config<T>(configs: impl Iterator<Item = T>, min_samples: u8, samples: impl Fn(&T) -> u8) -> Option<T> {
    configs.max_by_key(|c| {
        let n = samples(c);
        (n >= min_samples, std::cmp::Reverse(n))
    })
}
