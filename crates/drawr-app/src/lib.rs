//! Drawr Application
//!
//! Connects a drawing surface to a session client and provides the native
//! and browser entry points.

mod params;
mod whiteboard;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use params::{UrlParams, parse_params};
pub use whiteboard::{PumpStats, Whiteboard};
