//! Load-time material rules.
//!
//! The shipped model carries a brown placeholder material. It is swapped for
//! a deep blue one when the model arrives, and every mesh is switched to cast
//! and receive shadows.

use crate::{color::Color, data_structures::scene_graph::{MaterialDesc, SceneGraph}};

/// Replace every material whose base color is exactly `target_hex`.
///
/// The match is on the 24 bit sRGB value, so any unrelated mesh that happens
/// to share the color is recolored as well.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialOverride {
    pub target_hex: u32,
    pub replacement: MaterialDesc,
}

impl Default for MaterialOverride {
    fn default() -> Self {
        Self {
            target_hex: 0x8B4513,
            replacement: MaterialDesc {
                name: Some("deep blue".to_string()),
                ..MaterialDesc::standard(Color::from_hex(0x00008B), 0.8, 0.3)
            },
        }
    }
}

impl MaterialOverride {
    pub fn matches(&self, material: &MaterialDesc) -> bool {
        material.base_color.to_hex() == self.target_hex
    }

    /// Apply the override and enable both shadow flags on every mesh.
    /// Returns how many mesh primitives were given the replacement material.
    pub fn apply(&self, graph: &mut SceneGraph) -> usize {
        let matching: Vec<bool> = graph.materials.iter().map(|m| self.matches(m)).collect();
        let mut replacement: Option<usize> = None;
        let mut replaced = 0;

        // Materials cannot be appended while the meshes are borrowed, so the
        // replacement gets the index it will have once pushed.
        let replacement_idx = graph.materials.len();
        graph.traverse_meshes_mut(|mesh| {
            if matching.get(mesh.material).copied().unwrap_or(false) {
                mesh.material = *replacement.get_or_insert(replacement_idx);
                replaced += 1;
            }
            mesh.cast_shadow = true;
            mesh.receive_shadow = true;
        });
        if replacement.is_some() {
            graph.add_material(self.replacement.clone());
        }

        log::info!("Recolored {replaced} meshes to {:06x}", self.replacement.base_color.to_hex());
        replaced
    }
}
