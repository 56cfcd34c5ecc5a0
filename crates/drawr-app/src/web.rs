//! WebAssembly entry point and the Canvas2D host.

use crate::params::{UrlParams, parse_params};
use crate::whiteboard::Whiteboard;
use drawr_core::{
    CanvasHost, ClientConfig, DrawingSurface, HostEvent, HttpSessionApi, PlatformWebSocket,
    PointerButton, RenderTarget, SessionClient, StrokeWidth, StyleUpdate, SurfaceConfig,
    SurfaceError, SurfaceResult, Tool, WidthPreset,
};
use kurbo::{Affine, Point, Size};
use peniko::Color;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent,
    TouchEvent,
};

/// Milliseconds between pumps of the whiteboard.
const PUMP_INTERVAL_MS: i32 = 16;

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn css_colour(colour: Color) -> String {
    let c = colour.to_rgba8();
    format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, f64::from(c.a) / 255.0)
}

// ============================================================================
// Canvas2D render target
// ============================================================================

/// Render target drawing onto a 2D canvas context.
pub struct CanvasTarget {
    ctx: CanvasRenderingContext2d,
}

impl RenderTarget for CanvasTarget {
    fn clear(&mut self, size: Size, background: Color) {
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.ctx.set_fill_style_str(&css_colour(background));
        self.ctx.fill_rect(0.0, 0.0, size.width, size.height);
    }

    fn set_transform(&mut self, transform: Affine) {
        let [a, b, c, d, e, f] = transform.as_coeffs();
        if let Err(err) = self.ctx.set_transform(a, b, c, d, e, f) {
            log::warn!("Failed to set canvas transform: {err:?}");
        }
    }

    fn draw_segment(&mut self, from: Point, to: Point, colour: Color, width: f64) {
        self.ctx.set_stroke_style_str(&css_colour(colour));
        self.ctx.set_line_width(width);
        self.ctx.set_line_join("round");
        self.ctx.set_line_cap("round");
        self.ctx.begin_path();
        self.ctx.move_to(from.x, from.y);
        self.ctx.line_to(to.x, to.y);
        self.ctx.close_path();
        self.ctx.stroke();
    }
}

// ============================================================================
// Canvas host
// ============================================================================

/// Hosts a drawing surface inside a DOM element.
///
/// Browser input is collected by listeners and drained through
/// [`CanvasHost::poll_events`].
pub struct WebCanvasHost {
    container: HtmlElement,
    events: Rc<RefCell<Vec<HostEvent>>>,
    // Store closures to prevent them from being dropped
    listeners: Vec<Closure<dyn FnMut(Event)>>,
}

impl WebCanvasHost {
    /// Host the canvas inside the element with id `container_id`.
    pub fn new(container_id: &str) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document available"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("No element with id {container_id:?}")))?
            .dyn_into::<HtmlElement>()?;
        Ok(Self {
            container,
            events: Rc::new(RefCell::new(Vec::new())),
            listeners: Vec::new(),
        })
    }

    fn listen(
        &mut self,
        target: &EventTarget,
        name: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push(closure);
        Ok(())
    }

    fn attach_listeners(&mut self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        let target: &EventTarget = canvas.as_ref();

        let events = self.events.clone();
        self.listen(target, "mousedown", move |e| {
            if let Some(e) = e.dyn_ref::<MouseEvent>() {
                let button = match e.button() {
                    0 => PointerButton::Primary,
                    1 => PointerButton::Middle,
                    _ => PointerButton::Secondary,
                };
                events.borrow_mut().push(HostEvent::PointerDown {
                    position: Point::new(f64::from(e.offset_x()), f64::from(e.offset_y())),
                    button,
                    touches: 1,
                });
            }
        })?;

        let events = self.events.clone();
        self.listen(target, "mousemove", move |e| {
            if let Some(e) = e.dyn_ref::<MouseEvent>() {
                events.borrow_mut().push(HostEvent::PointerMove {
                    position: Point::new(f64::from(e.offset_x()), f64::from(e.offset_y())),
                    touches: 1,
                });
            }
        })?;

        for name in ["mouseup", "mouseleave"] {
            let events = self.events.clone();
            self.listen(target, name, move |e| {
                if let Some(e) = e.dyn_ref::<MouseEvent>() {
                    events.borrow_mut().push(HostEvent::PointerUp {
                        position: Point::new(f64::from(e.offset_x()), f64::from(e.offset_y())),
                    });
                }
            })?;
        }

        for name in ["touchstart", "touchmove", "touchend", "touchcancel"] {
            let events = self.events.clone();
            let canvas = canvas.clone();
            self.listen(target, name, move |e| {
                let Some(touch_event) = e.dyn_ref::<TouchEvent>() else {
                    return;
                };
                e.prevent_default();
                let touches = touch_event.touches().length() as usize;
                let Some(touch) = touch_event.changed_touches().get(0) else {
                    return;
                };
                let rect = canvas.get_bounding_client_rect();
                let position = Point::new(
                    f64::from(touch.client_x()) - rect.left(),
                    f64::from(touch.client_y()) - rect.top(),
                );
                let event = match e.type_().as_str() {
                    "touchstart" => HostEvent::PointerDown {
                        position,
                        button: PointerButton::Primary,
                        touches,
                    },
                    "touchmove" => HostEvent::PointerMove { position, touches },
                    _ => HostEvent::PointerUp { position },
                };
                events.borrow_mut().push(event);
            })?;
        }

        if let Some(window) = web_sys::window() {
            let events = self.events.clone();
            let container = self.container.clone();
            let canvas = canvas.clone();
            self.listen(window.as_ref(), "resize", move |_| {
                let width = container.client_width().max(0) as u32;
                let height = container.client_height().max(0) as u32;
                canvas.set_width(width);
                canvas.set_height(height);
                events.borrow_mut().push(HostEvent::Resize {
                    size: Size::new(f64::from(width), f64::from(height)),
                });
            })?;
        }

        Ok(())
    }
}

impl CanvasHost for WebCanvasHost {
    type Target = CanvasTarget;

    fn container_size(&self) -> Size {
        Size::new(
            f64::from(self.container.client_width()),
            f64::from(self.container.client_height()),
        )
    }

    fn create_surface(&mut self, size: Size) -> SurfaceResult<CanvasTarget> {
        let host_error = |e: JsValue| SurfaceError::Host(format!("{e:?}"));
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError::Host("No document available".to_string()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(host_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|e| host_error(e.into()))?;
        canvas.set_width(size.width.max(0.0) as u32);
        canvas.set_height(size.height.max(0.0) as u32);
        self.container.append_child(&canvas).map_err(host_error)?;

        let ctx = canvas
            .get_context("2d")
            .map_err(host_error)?
            .ok_or_else(|| SurfaceError::Host("2D context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|e| host_error(e.into()))?;

        self.attach_listeners(&canvas).map_err(host_error)?;
        Ok(CanvasTarget { ctx })
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

// ============================================================================
// Entry point
// ============================================================================

type Board = Whiteboard<WebCanvasHost, HttpSessionApi, PlatformWebSocket>;

/// Read session parameters from the page's query string and hash.
pub fn get_url_params() -> UrlParams {
    let Some(location) = web_sys::window().map(|w| w.location()) else {
        return UrlParams::default();
    };
    let query = location.search().map(|s| parse_params(&s)).unwrap_or_default();
    let hash = location.hash().map(|s| parse_params(&s)).unwrap_or_default();
    query.or(hash)
}

/// Session server at the page origin.
fn origin_config() -> Option<ClientConfig> {
    let location = web_sys::window()?.location();
    let secure = location.protocol().ok()? == "https:";
    let host = location.hostname().ok()?;
    let port = match location.port().ok()?.parse() {
        Ok(port) => port,
        Err(_) if secure => 443,
        Err(_) => 80,
    };
    Some(ClientConfig::new(host, port).secure(secure))
}

/// Handle to a running whiteboard, exposed to JavaScript.
#[wasm_bindgen]
pub struct WebBoard {
    board: Rc<RefCell<Board>>,
    interval_id: i32,
    _ticker: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl WebBoard {
    pub fn undo(&self) {
        self.board.borrow_mut().surface_mut().undo();
    }

    pub fn redo(&self) {
        self.board.borrow_mut().surface_mut().redo();
    }

    pub fn reset(&self) {
        self.board.borrow_mut().surface_mut().reset();
    }

    #[wasm_bindgen(js_name = setZoom)]
    pub fn set_zoom(&self, level: i32) -> Result<(), JsValue> {
        self.board.borrow_mut().surface_mut().set_zoom(level).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setColour)]
    pub fn set_colour(&self, colour: String) {
        self.update_style(StyleUpdate::default().colour(colour).tool(Tool::Pen));
    }

    /// Accepts `small`, `normal`, `large`, `huge` or a pixel width.
    #[wasm_bindgen(js_name = setWidth)]
    pub fn set_width(&self, width: &str) -> Result<(), JsValue> {
        let width = match width {
            "small" => StrokeWidth::Preset(WidthPreset::Small),
            "normal" => StrokeWidth::Preset(WidthPreset::Normal),
            "large" => StrokeWidth::Preset(WidthPreset::Large),
            "huge" => StrokeWidth::Preset(WidthPreset::Huge),
            other => StrokeWidth::Pixels(other.parse().map_err(to_js)?),
        };
        self.update_style(StyleUpdate::default().width(width));
        Ok(())
    }

    #[wasm_bindgen(js_name = setEraser)]
    pub fn set_eraser(&self, enabled: bool) {
        let tool = if enabled { Tool::Eraser } else { Tool::Pen };
        self.update_style(StyleUpdate::default().tool(tool));
    }

    fn update_style(&self, update: StyleUpdate) {
        self.board.borrow_mut().surface_mut().update_style(update);
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> Option<String> {
        self.board.borrow().client().session_id().map(str::to_string)
    }

    /// Every stroke point as JSON.
    #[wasm_bindgen(js_name = strokesJson)]
    pub fn strokes_json(&self) -> Result<String, JsValue> {
        let strokes = self.board.borrow().surface().strokes();
        serde_json::to_string(&strokes).map_err(to_js)
    }
}

impl Drop for WebBoard {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.interval_id);
        }
        self.board.borrow_mut().client_mut().close();
    }
}

/// Mount a whiteboard into the element `container_id` and connect it.
///
/// Joins `?session=` when given, otherwise creates a new session.
#[wasm_bindgen]
pub async fn start(container_id: String) -> Result<WebBoard, JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Starting Drawr (WASM)");

    let params = get_url_params();
    let config = params
        .server
        .as_deref()
        .and_then(ClientConfig::from_server)
        .or_else(origin_config)
        .unwrap_or_default();

    let host = WebCanvasHost::new(&container_id)?;
    let surface = DrawingSurface::new(host, SurfaceConfig::default()).map_err(to_js)?;
    let user = params.user.unwrap_or_else(|| "guest".to_string());
    let client = SessionClient::new(user, config, HttpSessionApi::new(), PlatformWebSocket::new());
    let mut board = Whiteboard::new(surface, client);

    let id = match params.session {
        Some(id) => board.join_session(&id).await,
        None => {
            let name = params.name.unwrap_or_else(|| "drawr".to_string());
            board.new_session(&name).await
        }
    }
    .map_err(to_js)?;
    log::info!("Joined session {id}");

    let board = Rc::new(RefCell::new(board));
    let ticker_board = board.clone();
    let ticker = Closure::wrap(Box::new(move || {
        ticker_board.borrow_mut().pump();
    }) as Box<dyn FnMut()>);
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let interval_id = window.set_interval_with_callback_and_timeout_and_arguments_0(
        ticker.as_ref().unchecked_ref(),
        PUMP_INTERVAL_MS,
    )?;

    Ok(WebBoard {
        board,
        interval_id,
        _ticker: ticker,
    })
}
