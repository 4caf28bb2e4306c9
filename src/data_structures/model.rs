//! GPU-side meshes and materials of a loaded model.
//!
//! [`Model::upload`] turns a [`SceneGraph`] into vertex, index and instance
//! buffers plus one bind group per material. The scene graph stays the source
//! of truth for transforms: [`Model::write_to_buffers`] copies the current
//! world transforms into the instance buffers every frame.

use std::{collections::HashMap, ops::Range};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        scene_graph::{AlphaMode, MaterialDesc, SamplerDesc, SceneGraph, TextureSlot},
        texture::{Texture, create_sampler},
    },
    resources::texture::material_texture_bindings,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    // w is 1 when a normal map is bound.
    emissive: [f32; 4],
    metalness: f32,
    roughness: f32,
    // Negative when alpha testing is off.
    alpha_cutoff: f32,
    normal_scale: f32,
    occlusion_strength: f32,
    _padding: [f32; 3],
}

impl From<&MaterialDesc> for MaterialUniform {
    fn from(desc: &MaterialDesc) -> Self {
        let [r, g, b] = desc.emissive;
        let has_normal_map = if desc.normal_texture.is_some() { 1.0 } else { 0.0 };
        Self {
            base_color: desc.base_color.to_array(),
            emissive: [r, g, b, has_normal_map],
            metalness: desc.metalness,
            roughness: desc.roughness,
            alpha_cutoff: match desc.alpha_mode {
                AlphaMode::Mask => desc.alpha_cutoff,
                AlphaMode::Opaque | AlphaMode::Blend => -1.0,
            },
            normal_scale: desc.normal_scale,
            occlusion_strength: desc.occlusion_strength,
            _padding: [0.0; 3],
        }
    }
}

/// Texture view and sampler of every [`TextureSlot`], in binding order.
pub type MaterialTextures<'a> = [(&'a wgpu::TextureView, &'a wgpu::Sampler); TextureSlot::COUNT];

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub blend: bool,
    pub double_sided: bool,
    #[allow(unused)]
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        desc: &MaterialDesc,
        textures: &MaterialTextures,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let name = desc.name.clone().unwrap_or_else(|| "unnamed material".to_string());
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} uniform")),
            contents: bytemuck::cast_slice(&[MaterialUniform::from(desc)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        for (binding, &(view, sampler)) in material_texture_bindings().zip(textures) {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some(&name),
        });

        Self {
            name,
            blend: desc.alpha_mode == AlphaMode::Blend,
            double_sided: desc.double_sided,
            buffer,
            bind_group,
        }
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    /// Scene graph node whose world transform places this mesh.
    pub node: usize,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub instance_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        graph: &SceneGraph,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        // An image used both as color and as data map is uploaded twice
        let mut textures: HashMap<(usize, bool), Texture> = HashMap::new();
        let mut samplers: HashMap<SamplerDesc, wgpu::Sampler> = HashMap::new();
        for desc in &graph.materials {
            for slot in TextureSlot::ALL {
                let Some(texture) = desc.texture(slot) else {
                    continue;
                };
                let Some(img) = graph.images.get(texture.image) else {
                    log::warn!("Material {:?} uses missing image {}", desc.name, texture.image);
                    continue;
                };
                textures.entry((texture.image, slot.is_srgb())).or_insert_with(|| {
                    let label = format!("image {} ({slot:?})", texture.image);
                    Texture::from_image(device, queue, img, slot.is_srgb(), Some(&label))
                });
                samplers
                    .entry(texture.sampler)
                    .or_insert_with(|| create_sampler(device, &texture.sampler));
            }
        }
        let white = Texture::create_white_pixel(device, queue);
        let default_sampler = create_sampler(device, &SamplerDesc::default());

        let materials = graph
            .materials
            .iter()
            .map(|desc| {
                let bound: MaterialTextures = TextureSlot::ALL.map(|slot| {
                    desc.texture(slot)
                        .and_then(|texture| {
                            let view = &textures.get(&(texture.image, slot.is_srgb()))?.view;
                            Some((view, samplers.get(&texture.sampler)?))
                        })
                        .unwrap_or((&white.view, &default_sampler))
                });
                Material::new(device, desc, &bound, layout)
            })
            .collect();

        let mut meshes = Vec::new();
        for (node, primitive) in graph.meshes() {
            if primitive.vertices.is_empty() || primitive.indices.is_empty() {
                log::warn!("Mesh {} has no geometry and is not drawn", primitive.name);
                continue;
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", primitive.name)),
                contents: bytemuck::cast_slice(&primitive.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", primitive.name)),
                contents: bytemuck::cast_slice(&primitive.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let raw = InstanceRaw::new(graph.nodes[node].world, primitive.receive_shadow);
            let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Instance Buffer", primitive.name)),
                contents: bytemuck::cast_slice(&[raw]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            meshes.push(Mesh {
                name: primitive.name.clone(),
                node,
                vertex_buffer,
                index_buffer,
                instance_buffer,
                num_elements: primitive.indices.len() as u32,
                material: primitive.material,
                cast_shadow: primitive.cast_shadow,
                receive_shadow: primitive.receive_shadow,
            });
        }
        log::info!(
            "Uploaded {} meshes, {} materials and {} textures",
            meshes.len(),
            graph.materials.len(),
            textures.len()
        );

        Self { meshes, materials }
    }

    pub fn write_to_buffers(&self, queue: &wgpu::Queue, graph: &SceneGraph) {
        for mesh in &self.meshes {
            let raw = InstanceRaw::new(graph.nodes[mesh.node].world, mesh.receive_shadow);
            queue.write_buffer(&mesh.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
        }
    }

    pub fn material_of(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials.get(mesh.material)
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );

    /// Geometry only, for depth passes. The pass' bind group 0 must already be set.
    fn draw_mesh_depth(&mut self, mesh: &Mesh, instances: Range<u32>);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_mesh_depth(&mut self, mesh: &Mesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}
