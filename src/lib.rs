//! pixel-room
//!
//! An interactive 3D room: a pixel-art glTF model lit by a hemispheric and a
//! spot light, a sphere bouncing on the floor under rigid-body physics and an
//! HDR post-processing chain with bloom and depth of field. Runs natively in a
//! winit window or in the browser on a `<canvas>`.
//!
//! High-level modules
//! - `camera`: free camera, controller and uniforms for view/projection
//! - `config`: scene configuration and run mode
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances, textures, primitives and the scene graph
//! - `debug_layer`: development overlay with axes, light cone and colliders
//! - `flow`: event loop and scene lifecycle
//! - `lights`: hemispheric and spot light
//! - `physics`: rigid-body world and impostors
//! - `pipelines`: the lit pipeline and the overlay line pipeline
//! - `post_process`: bloom, depth of field and the final merge
//! - `render`: render composition for batching
//! - `resources`: asset IO and glTF loading
//! - `scene`: the room itself
//! - `startup`: concurrent loading of everything the scene needs
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug_layer;
pub mod flow;
pub mod lights;
pub mod physics;
pub mod pipelines;
pub mod post_process;
pub mod render;
pub mod resources;
pub mod scene;
pub mod startup;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Build and run the room with configuration from the environment.
pub fn run() -> anyhow::Result<()> {
    let config = config::SceneConfig::from_env();
    flow::run(config, vec![scene::RoomScene::constructor()])
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
