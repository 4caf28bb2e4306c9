use image::ImageFormat;

use crate::data_structures::scene_graph::TextureSlot;

/// Layout of a material's bind group: the material uniform followed by a
/// texture and sampler pair for every [`TextureSlot`].
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    for binding in material_texture_bindings() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: binding + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("material_bind_group_layout"),
    })
}

/// Texture binding of each slot; its sampler sits at the next binding.
pub fn material_texture_bindings() -> impl Iterator<Item = u32> {
    (0..TextureSlot::COUNT as u32).map(|slot| 1 + 2 * slot)
}

/// Decode an image, using the MIME type as a hint when there is one and
/// sniffing the format otherwise.
pub fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> anyhow::Result<image::RgbaImage> {
    let format = mime_type.and_then(ImageFormat::from_mime_type);
    let img = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([139, 69, 19, 255]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_with_and_without_mime_type() {
        let bytes = png(3, 2);
        let hinted = decode_image(&bytes, Some("image/png")).unwrap();
        let sniffed = decode_image(&bytes, None).unwrap();
        assert_eq!(hinted.dimensions(), (3, 2));
        assert_eq!(hinted, sniffed);
        assert_eq!(hinted.get_pixel(2, 1).0, [139, 69, 19, 255]);
    }

    #[test]
    fn texture_slots_bind_in_pairs_after_the_uniform() {
        let bindings: Vec<u32> = material_texture_bindings().collect();
        assert_eq!(bindings, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode_image(b"not an image", Some("image/png")).is_err());
        assert!(decode_image(b"not an image", None).is_err());
    }
}
