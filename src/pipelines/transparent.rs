use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{PipelineOptions, mk_render_pipeline},
};

/**
 * Pipeline for materials with `BLEND` alpha mode.
 *
 * Shares the shader of the basic pipeline but blends over what is already in
 * the target and leaves the depth buffer untouched, so blended meshes have to
 * be drawn after every opaque one.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
    double_sided: bool,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Standard Shader (blended)"),
        source: wgpu::ShaderSource::Wgsl(include_str!("standard.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        layout,
        color_format,
        PipelineOptions {
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: (!double_sided).then_some(wgpu::Face::Back),
            depth_write: false,
            sample_count,
        },
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
