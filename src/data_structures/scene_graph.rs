//! CPU-side scene graph of a loaded asset.
//!
//! The hierarchy is an index arena: nodes refer to their children by index so
//! animation channels can address nodes by the index the asset gave them.
//! Everything here is plain data, which lets loading happen off the render
//! thread and lets the load-time rules run without a GPU.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    color::Color,
    data_structures::{instance::Instance, model::ModelVertex},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Fragments below the cutoff are discarded.
    Mask,
    Blend,
}

/// How a texture is filtered and wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub wrap_u: wgpu::AddressMode,
    pub wrap_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            wrap_u: wgpu::AddressMode::Repeat,
            wrap_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
        }
    }
}

/// An image used by a material together with the way it is sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRef {
    /// Index into [`SceneGraph::images`].
    pub image: usize,
    pub sampler: SamplerDesc,
}

impl TextureRef {
    pub fn new(image: usize) -> Self {
        Self {
            image,
            sampler: SamplerDesc::default(),
        }
    }
}

/// Texture slots of a material in the order they are bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSlot {
    BaseColor,
    /// Roughness in green, metalness in blue.
    MetallicRoughness,
    Normal,
    /// Ambient occlusion in red.
    Occlusion,
    Emissive,
}

impl TextureSlot {
    pub const COUNT: usize = 5;
    pub const ALL: [TextureSlot; Self::COUNT] = [
        TextureSlot::BaseColor,
        TextureSlot::MetallicRoughness,
        TextureSlot::Normal,
        TextureSlot::Occlusion,
        TextureSlot::Emissive,
    ];

    /// Color maps are sRGB encoded, data maps are linear.
    pub fn is_srgb(self) -> bool {
        matches!(self, TextureSlot::BaseColor | TextureSlot::Emissive)
    }
}

/// Parameters of a metallic-roughness material.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: Option<String>,
    /// Linear base color, multiplied with the texture when there is one.
    pub base_color: Color,
    pub base_color_texture: Option<TextureRef>,
    pub metalness: f32,
    pub roughness: f32,
    /// Scales `metalness` and `roughness`.
    pub metallic_roughness_texture: Option<TextureRef>,
    /// Tangent space normal map.
    pub normal_texture: Option<TextureRef>,
    /// Scales the x and y of the normal map.
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    /// 0 ignores the occlusion map, 1 applies it fully.
    pub occlusion_strength: f32,
    /// Linear emitted color, multiplied with the texture when there is one.
    pub emissive: [f32; 3],
    pub emissive_texture: Option<TextureRef>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl MaterialDesc {
    /// An untextured opaque material.
    pub fn standard(base_color: Color, metalness: f32, roughness: f32) -> Self {
        Self {
            name: None,
            base_color,
            base_color_texture: None,
            metalness,
            roughness,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive: [0.0; 3],
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }

    /// What a primitive without a material is shaded with.
    pub fn fallback() -> Self {
        Self {
            name: Some("default".to_string()),
            ..Self::standard(Color::WHITE, 1.0, 1.0)
        }
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<TextureRef> {
        match slot {
            TextureSlot::BaseColor => self.base_color_texture,
            TextureSlot::MetallicRoughness => self.metallic_roughness_texture,
            TextureSlot::Normal => self.normal_texture,
            TextureSlot::Occlusion => self.occlusion_texture,
            TextureSlot::Emissive => self.emissive_texture,
        }
    }
}

/// One drawable piece of geometry with a single material.
#[derive(Clone, Debug)]
pub struct MeshPrimitive {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Index into [`SceneGraph::materials`].
    pub material: usize,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: Option<String>,
    pub local: Instance,
    /// Parent world matrix times the local matrix.
    pub world: Matrix4<f32>,
    pub children: Vec<usize>,
    pub meshes: Vec<MeshPrimitive>,
}

impl Node {
    pub fn new(name: Option<String>, local: Instance) -> Self {
        Self {
            name,
            local,
            world: Matrix4::identity(),
            children: Vec::new(),
            meshes: Vec::new(),
        }
    }

    pub fn world_position(&self) -> Vector3<f32> {
        self.world.w.truncate()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(None, Instance::default())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub materials: Vec<MaterialDesc>,
    pub images: Vec<image::RgbaImage>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_material(&mut self, material: MaterialDesc) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Put a new node with transform `local` above the current roots and make
    /// it the only root. Returns its index.
    pub fn wrap_roots(&mut self, name: &str, local: Instance) -> usize {
        let mut root = Node::new(Some(name.to_string()), local);
        root.children = std::mem::take(&mut self.roots);
        let idx = self.add_node(root);
        self.roots = vec![idx];
        idx
    }

    /// Indices of all nodes reachable from the roots, parents before children.
    /// A node reachable twice (malformed input) is only visited once.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            match visited.get_mut(idx) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => {
                    log::warn!("Node {idx} is referenced more than once and was skipped");
                    continue;
                }
                None => {
                    log::warn!("Node {idx} does not exist");
                    continue;
                }
            }
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        order
    }

    /// Every mesh primitive in the hierarchy together with its node index.
    pub fn meshes(&self) -> impl Iterator<Item = (usize, &MeshPrimitive)> {
        self.depth_first()
            .into_iter()
            .flat_map(move |idx| self.nodes[idx].meshes.iter().map(move |mesh| (idx, mesh)))
    }

    pub fn traverse_meshes_mut(&mut self, mut visit: impl FnMut(&mut MeshPrimitive)) {
        for idx in self.depth_first() {
            self.nodes[idx].meshes.iter_mut().for_each(&mut visit);
        }
    }

    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(usize, Matrix4<f32>)> = self
            .roots
            .iter()
            .map(|&idx| (idx, Matrix4::identity()))
            .collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((idx, parent)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(idx) else {
                continue;
            };
            if std::mem::replace(&mut visited[idx], true) {
                continue;
            }
            node.world = parent * node.local.to_matrix();
            let world = node.world;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
    }
}
