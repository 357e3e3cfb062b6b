//! Browser host: mounts the canvas into the page container, forwards DOM
//! events to the director and drives it from `requestAnimationFrame`.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use gloo_events::{EventListener, EventListenerOptions};
use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Document, Element, HtmlCanvasElement, PointerEvent, Response, WheelEvent, Window};

use crate::assets::{decode_font, AssetEvent, AssetInbox};
use crate::config::DirectorConfig;
use crate::controls::PointerButton;
use crate::director::SceneDirector;
use crate::error::{AssetError, DirectorError, RenderError};
use crate::model::LoadedModel;
use crate::render::GpuRenderer;
use crate::tween::ElementBounds;
use crate::viewport::Viewport;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Builds the scene inside the configured container and starts animating.
///
/// `config_json` overrides any subset of the default configuration.
#[wasm_bindgen]
pub async fn start(config_json: Option<String>) -> Result<(), JsValue> {
    run(config_json)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

async fn run(config_json: Option<String>) -> Result<(), DirectorError> {
    let config = match config_json.as_deref() {
        Some(json) => DirectorConfig::from_json(json)?,
        None => DirectorConfig::default(),
    };

    let window = web_sys::window().ok_or_else(|| host_error("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| host_error("document not available"))?;
    let container = document
        .get_element_by_id(&config.container_id)
        .ok_or_else(|| DirectorError::MissingContainer(config.container_id.clone()))?;

    let viewport = window_viewport(&window);
    let canvas = create_canvas(&document, &container)?;
    resize_canvas(&canvas, viewport);

    let renderer =
        GpuRenderer::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), viewport).await?;
    let font_url = config.text.font_url.clone();
    let model_url = config.model.url.clone();
    let mut director = SceneDirector::new(config, renderer, viewport)?;
    director.set_container(container_bounds(&window, &container));
    director.on_scroll(scroll_y(&window));

    spawn_loads(font_url, model_url, director.inbox());

    let app = Rc::new(RefCell::new(WebApp {
        director,
        window: window.clone(),
        canvas: canvas.clone(),
        container,
        _listeners: Vec::new(),
        last_timestamp: None,
    }));
    let listeners = attach_listeners(&window, &canvas, &app);
    app.borrow_mut()._listeners = listeners;

    start_animation_loop(app)
}

fn host_error(message: &str) -> DirectorError {
    DirectorError::Host(message.to_string())
}

struct WebApp {
    director: SceneDirector<GpuRenderer>,
    window: Window,
    canvas: HtmlCanvasElement,
    container: Element,
    _listeners: Vec<EventListener>,
    last_timestamp: Option<f64>,
}

impl WebApp {
    /// Draws one frame; returns whether the loop should continue.
    fn frame(&mut self, timestamp: f64) -> bool {
        let dt = self
            .last_timestamp
            .map(|last| ((timestamp - last) / 1000.0) as f32)
            .unwrap_or(0.0);
        self.last_timestamp = Some(timestamp);
        match self.director.frame(dt) {
            Ok(()) => true,
            Err(RenderError::OutOfMemory) => {
                log::error!("GPU is out of memory; stopping the animation loop");
                false
            }
            Err(err) => {
                log::error!("render failed: {err}");
                true
            }
        }
    }

    fn resize(&mut self) {
        let viewport = window_viewport(&self.window);
        if viewport.is_empty() {
            return;
        }
        resize_canvas(&self.canvas, viewport);
        self.director.on_resize(viewport);
        self.director
            .set_container(container_bounds(&self.window, &self.container));
    }
}

fn create_canvas(
    document: &Document,
    container: &Element,
) -> Result<HtmlCanvasElement, DirectorError> {
    let canvas = document
        .create_element("canvas")
        .map_err(|err| DirectorError::Host(format!("failed to create canvas: {err:?}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| host_error("created element is not a canvas"))?;
    container
        .append_child(&canvas)
        .map_err(|err| DirectorError::Host(format!("failed to append canvas: {err:?}")))?;
    Ok(canvas)
}

fn resize_canvas(canvas: &HtmlCanvasElement, viewport: Viewport) {
    canvas.set_width(viewport.width);
    canvas.set_height(viewport.height);
    let style = canvas.style();
    let _ = style.set_property("width", &format!("{}px", viewport.width));
    let _ = style.set_property("height", &format!("{}px", viewport.height));
}

fn window_viewport(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0)
            .max(0.0) as u32
    };
    Viewport::new(
        dimension(window.inner_width()),
        dimension(window.inner_height()),
    )
}

fn scroll_y(window: &Window) -> f32 {
    window.scroll_y().unwrap_or(0.0) as f32
}

/// Container bounds in document coordinates.
fn container_bounds(window: &Window, container: &Element) -> ElementBounds {
    let rect = container.get_bounding_client_rect();
    ElementBounds {
        top: rect.top() as f32 + scroll_y(window),
        height: rect.height() as f32,
    }
}

fn pointer_button(button: i16) -> Option<PointerButton> {
    match button {
        0 => Some(PointerButton::Primary),
        1 => Some(PointerButton::Middle),
        2 => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn attach_listeners(
    window: &Window,
    canvas: &HtmlCanvasElement,
    app: &Rc<RefCell<WebApp>>,
) -> Vec<EventListener> {
    let mut listeners = Vec::new();

    {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(window, "pointermove", move |event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let position = Vec2::new(event.client_x() as f32, event.client_y() as f32);
            app.borrow_mut().director.on_pointer_move(position);
        }));
    }

    {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(window, "resize", move |_| {
            app.borrow_mut().resize();
        }));
    }

    {
        let app = Rc::clone(app);
        let scroll_window = window.clone();
        listeners.push(EventListener::new(window, "scroll", move |_| {
            app.borrow_mut().director.on_scroll(scroll_y(&scroll_window));
        }));
    }

    {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(canvas, "pointerdown", move |event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let Some(button) = pointer_button(event.button()) else {
                return;
            };
            let position = Vec2::new(event.client_x() as f32, event.client_y() as f32);
            app.borrow_mut().director.on_pointer_down(button, position);
        }));
    }

    {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(window, "pointerup", move |_| {
            app.borrow_mut().director.on_pointer_up();
        }));
    }

    {
        let app = Rc::clone(app);
        let options = EventListenerOptions::enable_prevent_default();
        listeners.push(EventListener::new_with_options(
            canvas,
            "wheel",
            options,
            move |event| {
                let Some(event) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                event.prevent_default();
                app.borrow_mut().director.on_wheel(event.delta_y() as f32);
            },
        ));
    }

    listeners.push(EventListener::new_with_options(
        canvas,
        "contextmenu",
        EventListenerOptions::enable_prevent_default(),
        |event| event.prevent_default(),
    ));

    listeners
}

fn start_animation_loop(app: Rc<RefCell<WebApp>>) -> Result<(), DirectorError> {
    let window = app.borrow().window.clone();
    let callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&callback);
    let loop_window = window.clone();

    *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
        if !app.borrow_mut().frame(timestamp) {
            return;
        }
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = loop_window.request_animation_frame(closure.as_ref().unchecked_ref()) {
                log::error!("requestAnimationFrame failed: {err:?}");
            }
        }
    }));

    let first = callback.borrow();
    let closure = first
        .as_ref()
        .ok_or_else(|| host_error("animation callback missing"))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| DirectorError::Host(format!("requestAnimationFrame failed: {err:?}")))?;
    Ok(())
}

fn spawn_loads(font_url: String, model_url: String, inbox: AssetInbox) {
    let font_inbox = inbox.clone();
    spawn_local(async move {
        let result = fetch_bytes(&font_url)
            .await
            .and_then(|bytes| decode_font(&bytes));
        font_inbox.push(AssetEvent::Font(result));
    });

    spawn_local(async move {
        let result = fetch_bytes(&model_url)
            .await
            .and_then(|bytes| LoadedModel::from_slice(&bytes));
        inbox.push(AssetEvent::Model(result));
    });
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, AssetError> {
    let fetch_error = |reason: String| AssetError::Fetch {
        url: url.to_string(),
        reason,
    };
    let window = web_sys::window().ok_or_else(|| fetch_error("window not available".into()))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|err| fetch_error(format!("{err:?}")))?
        .dyn_into::<Response>()
        .map_err(|_| fetch_error("fetch did not return a response".into()))?;
    if !response.ok() {
        return Err(fetch_error(format!("HTTP {}", response.status())));
    }
    let buffer = response
        .array_buffer()
        .map_err(|err| fetch_error(format!("{err:?}")))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|err| fetch_error(format!("{err:?}")))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}
