//! WebSocket transport for WASM.

use super::{SocketState, Transport, TransportError, TransportEvent};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// Close code sent when the client hangs up.
const NORMAL_CLOSURE: u16 = 1000;

/// WebSocket client for WASM.
///
/// Events are collected by browser callbacks and must be polled via
/// [`Transport::poll_events`].
pub struct WasmWebSocket {
    ws: Option<WebSocket>,
    state: SocketState,
    events: Rc<RefCell<Vec<TransportEvent>>>,
    // Store closures to prevent them from being dropped
    _on_open: Option<Closure<dyn Fn()>>,
    _on_message: Option<Closure<dyn Fn(MessageEvent)>>,
    _on_close: Option<Closure<dyn Fn(CloseEvent)>>,
    _on_error: Option<Closure<dyn Fn(Event)>>,
}

impl WasmWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            ws: None,
            state: SocketState::Disconnected,
            events: Rc::new(RefCell::new(Vec::new())),
            _on_open: None,
            _on_message: None,
            _on_close: None,
            _on_error: None,
        }
    }

    fn detach(&mut self) {
        if let Some(ws) = &self.ws {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            ws.set_onerror(None);
        }
        self.ws = None;
        self._on_open = None;
        self._on_message = None;
        self._on_close = None;
        self._on_error = None;
    }
}

impl Default for WasmWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WasmWebSocket {
    fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        if self.ws.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let ws = WebSocket::new(url).map_err(|e| TransportError::Connect(format!("{e:?}")))?;
        ws.set_binary_type(web_sys::BinaryType::Arraybuffer);
        self.state = SocketState::Connecting;

        let events = self.events.clone();

        // onopen
        let events_open = events.clone();
        let on_open = Closure::wrap(Box::new(move || {
            events_open.borrow_mut().push(TransportEvent::Open);
        }) as Box<dyn Fn()>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        // onmessage
        let events_msg = events.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().dyn_into::<js_sys::JsString>() {
                Ok(text) => events_msg
                    .borrow_mut()
                    .push(TransportEvent::Message(text.into())),
                Err(_) => log::warn!("Ignoring non-text WebSocket frame"),
            }
        }) as Box<dyn Fn(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        // onclose
        let events_close = events.clone();
        let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
            events_close.borrow_mut().push(TransportEvent::Closed { reason: e.reason() });
        }) as Box<dyn Fn(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        // onerror
        let events_err = events;
        let on_error = Closure::wrap(Box::new(move |_e: Event| {
            events_err.borrow_mut().push(TransportEvent::Error {
                message: "WebSocket error".to_string(),
            });
        }) as Box<dyn Fn(Event)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.ws = Some(ws);
        self._on_open = Some(on_open);
        self._on_message = Some(on_message);
        self._on_close = Some(on_close);
        self._on_error = Some(on_error);

        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        match &self.ws {
            Some(ws) => ws
                .send_with_str(text)
                .map_err(|e| TransportError::Send(format!("{e:?}"))),
            None => Err(TransportError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        let mut ended = false;
        for event in &events {
            self.state = self.state.after(event);
            ended |= matches!(event, TransportEvent::Closed { .. });
        }
        if ended {
            self.detach();
        }
        events
    }

    fn state(&self) -> SocketState {
        self.state
    }

    fn close(&mut self) {
        if let Some(ws) = &self.ws {
            let _ = ws.close_with_code_and_reason(NORMAL_CLOSURE, "client closed");
        }
        self.detach();
        self.events.borrow_mut().clear();
        self.state = SocketState::Disconnected;
    }
}
