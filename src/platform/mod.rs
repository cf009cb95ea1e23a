//! Platform bindings
//!
//! The simulation, session and views are platform-independent. The browser
//! layer wires them to a canvas, animation frames, keyboard listeners and
//! `fetch`.

#[cfg(target_arch = "wasm32")]
pub mod web;
