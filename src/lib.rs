//! hero-scene
//!
//! A 3D hero banner for a web page: one glTF model under a fixed light rig,
//! orbit controls, shadows, the model's own animations and a transition tied
//! to page scrolling. The same code runs in the browser (WebGL2 through wgpu)
//! and in a native window.
//!
//! High-level modules
//! - `flow`: the winit application and [`run`]
//! - `viewer`: the scene bootstrapper tying context, model and animation together
//! - `context`: GPU and window context that owns device, queue and pipelines
//! - `camera` / `controls`: perspective camera and orbit controls
//! - `pipelines`: the standard, blended and shadow pipelines plus the light rig
//! - `resources`: fetching and parsing of glTF assets
//! - `data_structures`: scene graph, GPU models, textures and instances
//! - `animation`: clip playback
//! - `recolor`: load-time material override
//! - `scroll`: the scroll transition
//! - `render`: frame composition

pub mod animation;
pub mod camera;
pub mod color;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
#[cfg(target_arch = "wasm32")]
pub mod dom;
pub mod flow;
pub mod pipelines;
pub mod recolor;
pub mod render;
pub mod resources;
pub mod scroll;
pub mod viewer;

pub use config::ViewerConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point. Startup failures are thrown as exceptions.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
