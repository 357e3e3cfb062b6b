//! Desktop host. A window stands in for the page: the keyboard scrolls a
//! virtual document laid out by [`PageConfig`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::Vec2;
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::assets::{AssetLoaders, AssetSource};
use crate::config::{DirectorConfig, PageConfig};
use crate::controls::PointerButton;
use crate::director::SceneDirector;
use crate::error::RenderError;
use crate::render::GpuRenderer;
use crate::viewport::Viewport;

/// The platform has no usable display; callers may fall back to a
/// headless run.
#[derive(Debug, thiserror::Error)]
#[error("failed to initialize {stage}: {message}")]
pub struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &'static str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            stage,
            message: panic_message(panic),
        }
    }

    fn from_error(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Opens a window and runs the scene until it is closed.
pub fn run_windowed(config: DirectorConfig, size: Viewport) -> Result<()> {
    // Some platforms panic instead of returning an error without a display.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    let mut app = WindowedApp::new(config, size);
    event_loop.run_app(&mut app)?;
    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Running {
    window: Arc<Window>,
    director: SceneDirector<GpuRenderer>,
}

struct WindowedApp {
    config: Option<DirectorConfig>,
    size: Viewport,
    running: Option<Running>,
    cursor: Vec2,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl WindowedApp {
    fn new(config: DirectorConfig, size: Viewport) -> Self {
        Self {
            config: Some(config),
            size,
            running: None,
            cursor: Vec2::ZERO,
            last_frame: Instant::now(),
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(config) = self.config.take() else {
            return Ok(());
        };
        let attributes = Window::default_attributes()
            .with_title("Scroll Scene")
            .with_inner_size(LogicalSize::new(
                self.size.width as f64,
                self.size.height as f64,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let inner = window.inner_size();
        let viewport = Viewport::new(inner.width.max(1), inner.height.max(1));
        let renderer = block_on(GpuRenderer::new(Arc::clone(&window), viewport))?;

        let font = AssetSource::parse(&config.text.font_url);
        let model = AssetSource::parse(&config.model.url);
        let director = SceneDirector::new(config, renderer, viewport)?;
        // Loads finish on their own threads and land in the inbox.
        let _loaders = AssetLoaders::spawn(font, model, &director.inbox());

        window.request_redraw();
        self.running = Some(Running { window, director });
        self.last_frame = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowedApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.window.id() != window_id {
            return;
        }
        let director = &mut running.director;

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                director.on_resize(Viewport::new(size.width, size.height));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                director.on_pointer_move(self.cursor);
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if let Some(button) = pointer_button(button) {
                        director.on_pointer_down(button, self.cursor);
                    }
                }
                ElementState::Released => director.on_pointer_up(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                // DOM convention: positive deltas scroll down
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => -lines * 100.0,
                    MouseScrollDelta::PixelDelta(pixels) => -pixels.y as f32,
                };
                director.on_wheel(delta_y);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    let viewport = director.viewport();
                    let page = &director.config().page;
                    let current = director.scroll_y();
                    if let Some(offset) = scroll_for_key(code, current, viewport, page) {
                        log::debug!("virtual scroll {offset:.0}px");
                        director.on_scroll(offset);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                match director.frame(dt) {
                    Ok(()) => {}
                    Err(RenderError::OutOfMemory) => {
                        self.fail(event_loop, anyhow!(RenderError::OutOfMemory));
                        return;
                    }
                    Err(err) => log::error!("render failed: {err}"),
                }
                running.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

/// Furthest the virtual page scrolls: its bottom meets the viewport bottom.
pub fn max_scroll(viewport: Viewport, page: &PageConfig) -> f32 {
    let height = viewport.height as f32;
    ((page.container_offset + page.container_height) * height - height).max(0.0)
}

/// New scroll offset for a navigation key, if it is one.
pub fn scroll_for_key(
    code: KeyCode,
    current: f32,
    viewport: Viewport,
    page: &PageConfig,
) -> Option<f32> {
    let page_step = viewport.height as f32 * 0.9;
    let offset = match code {
        KeyCode::ArrowDown => current + page.scroll_step,
        KeyCode::ArrowUp => current - page.scroll_step,
        KeyCode::PageDown | KeyCode::Space => current + page_step,
        KeyCode::PageUp => current - page_step,
        KeyCode::Home => 0.0,
        KeyCode::End => max_scroll(viewport, page),
        _ => return None,
    };
    Some(offset.clamp(0.0, max_scroll(viewport, page)))
}
