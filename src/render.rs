//! Frame composition.
//!
//! A frame is one shadow pass per shadow map layer followed by the main pass.
//! The main pass draws opaque meshes first and blended meshes after them so
//! blending sees the finished opaque depth buffer.

use std::iter;

use crate::{
    context::Context,
    data_structures::model::{DrawModel, Mesh, Model},
};

/// Render one frame. Without a model only the clear colour is drawn.
pub fn render_frame(ctx: &Context, model: Option<&Model>) -> Result<(), wgpu::SurfaceError> {
    // Rendering requires the surface to be configured
    if !ctx.is_surface_configured {
        return Ok(());
    }

    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

    if let Some(model) = model {
        encode_shadow_passes(ctx, &mut encoder, model);
    }

    {
        let (target, resolve_target) = match &ctx.msaa_target {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if let Some(model) = model {
            let (blended, opaque): (Vec<&Mesh>, Vec<&Mesh>) = model
                .meshes
                .iter()
                .partition(|mesh| model.material_of(mesh).is_some_and(|m| m.blend));
            for mesh in opaque.into_iter().chain(blended) {
                let Some(material) = model.material_of(mesh) else {
                    continue;
                };
                render_pass.set_pipeline(ctx.pipelines.for_material(material));
                render_pass.draw_mesh_instanced(
                    mesh,
                    material,
                    0..1,
                    &ctx.camera.bind_group,
                    &ctx.lights.bind_group,
                );
            }
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}

fn encode_shadow_passes(ctx: &Context, encoder: &mut wgpu::CommandEncoder, model: &Model) {
    let shadow = &ctx.pipelines.shadow;
    for (idx, layer) in shadow.layers.iter().enumerate() {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&format!("Shadow Pass {idx}")),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &layer.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&shadow.pipeline);
        pass.set_bind_group(0, &layer.bind_group, &[]);
        for mesh in model.meshes.iter().filter(|mesh| mesh.cast_shadow) {
            pass.draw_mesh_depth(mesh, 0..1);
        }
    }
}
