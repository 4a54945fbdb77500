//! Render pipelines.
//!
//! - `basic` draws lit, textured, instanced models into the scene target
//! - `debug` draws the coloured line overlay of the debug layer

pub mod basic;
pub mod debug;
