//! Engine data structures: scene graph, models, textures and instances.
//!
//! - `scene_graph` holds the CPU-side hierarchy, materials and images of a loaded asset
//! - `model` contains the GPU buffers and bind groups the scene graph is drawn with
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-mesh transformation data

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
