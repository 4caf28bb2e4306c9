//! Render pipelines.
//!
//! - `basic` draws opaque and alpha tested meshes
//! - `transparent` draws blended meshes on top of them
//! - `shadow` renders shadow casters into the shadow maps
//! - `light` holds the lights and the bind group they are exposed through

use crate::{
    data_structures::model::Material,
    pipelines::{
        basic::mk_basic_pipeline, light::LightResources, shadow::ShadowPass,
        transparent::mk_transparent_pipeline,
    },
    resources::texture::material_layout,
};

pub mod basic;
pub mod light;
pub mod shadow;
pub mod transparent;

/// Every pipeline a frame may need, created once up front.
#[derive(Debug)]
pub struct Pipelines {
    /// Indexed by `double_sided`.
    opaque: [wgpu::RenderPipeline; 2],
    /// Indexed by `double_sided`.
    blended: [wgpu::RenderPipeline; 2],
    pub shadow: ShadowPass,
    pub material_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        camera_layout: &wgpu::BindGroupLayout,
        lights: &LightResources,
    ) -> Self {
        let material_layout = material_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&material_layout, camera_layout, &lights.bind_group_layout],
            push_constant_ranges: &[],
        });

        let opaque = [false, true]
            .map(|double_sided| mk_basic_pipeline(device, color_format, &layout, double_sided, sample_count));
        let blended = [false, true].map(|double_sided| {
            mk_transparent_pipeline(device, color_format, &layout, double_sided, sample_count)
        });

        Self {
            opaque,
            blended,
            shadow: ShadowPass::new(device, lights),
            material_layout,
        }
    }

    pub fn for_material(&self, material: &Material) -> &wgpu::RenderPipeline {
        let variants = if material.blend { &self.blended } else { &self.opaque };
        &variants[usize::from(material.double_sided)]
    }
}
