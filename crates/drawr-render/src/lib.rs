//! Drawr Render Library
//!
//! GPU scene building for Drawr surfaces. [`SceneTarget`] implements the core
//! `RenderTarget` trait on top of a Vello [`Scene`](vello::Scene).

mod scene;

pub use scene::SceneTarget;
