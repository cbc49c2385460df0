use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx};
use crate::device::{GlDevice, GlInit};
use crate::gfx::GlowContext;
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub gl: GlInit,
    /// Close the window when Escape is pressed.
    pub close_on_escape: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "primer".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            gl: GlInit::default(),
            close_on_escape: true,
        }
    }
}

impl RuntimeConfig {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs `app` until it exits or the window closes.
    ///
    /// Returns the first failure seen inside the loop (context creation,
    /// `App::init`, buffer swaps), after the loop has shut down.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: App<GlowContext>,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct AppState<A>
where
    A: App<GlowContext>,
{
    config: RuntimeConfig,
    app: A,

    device: Option<GlDevice>,
    clock: FrameClock,

    failure: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App<GlowContext>,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            device: None,
            clock: FrameClock::new(),
            failure: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        self.request_exit(event_loop);
    }

    fn create_device(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let mut device = GlDevice::new(event_loop, attrs, &self.config.gl)
            .with_context(|| format!("failed to open window `{}`", self.config.title))?;

        let init = self.app.init(device.gl_mut()).context("lesson setup failed");
        device.window().request_redraw();
        // Keep the device even on failure so `on_exit` still sees a live context.
        self.device = Some(device);
        init?;

        self.clock.reset();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(device) = self.device.as_mut() else {
            return;
        };

        let time = self.clock.tick();
        let size = device.size();

        let control = {
            let mut ctx = FrameCtx::new(device.gl_mut(), time, (size.width, size.height));
            self.app.on_frame(&mut ctx)
        };

        let presented = device.present();
        if let Err(e) = presented {
            self.fail(event_loop, e);
            return;
        }

        if control == AppControl::Exit {
            self.request_exit(event_loop);
        }
    }
}

fn is_escape_press(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App<GlowContext>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.device.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_device(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw; every lesson animates or at least clears.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(device) = &self.device {
            device.window().request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),

            WindowEvent::KeyboardInput { event: key, .. }
                if self.config.close_on_escape && is_escape_press(key) =>
            {
                log::debug!("escape pressed; closing");
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(device) = self.device.as_mut() {
                    device.resize(*new_size);
                    device.window().request_redraw();
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(device) = self.device.as_mut() {
                    let new_size = device.window().inner_size();
                    device.resize(new_size);
                    device.window().request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut device) = self.device.take() {
            self.app.on_exit(device.gl_mut());
            log::debug!("releasing GL context");
        }
    }
}
