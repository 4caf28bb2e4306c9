use anyhow::Context as _;
use cgmath::{InnerSpace, Quaternion, Vector3};

use crate::{
    color::Color,
    config::AssetConfig,
    data_structures::{
        instance::Instance,
        model::ModelVertex,
        scene_graph::{AlphaMode, MaterialDesc, MeshPrimitive, Node, SamplerDesc, SceneGraph, TextureRef},
    },
    resources::{
        animation::{AnimationClip, read_animations},
        fetch::{Progress, load_binary},
        texture::decode_image,
    },
};

/**
 * This module contains all logic for loading the model and the files it
 * references. Nothing here touches the GPU: the result is a plain scene graph
 * that is uploaded once it reaches the render thread.
 */
pub mod animation;
pub mod fetch;
pub mod texture;

/// A parsed model: its node hierarchy and the animation clips it carries.
#[derive(Clone, Debug, Default)]
pub struct SceneAsset {
    pub graph: SceneGraph,
    pub clips: Vec<AnimationClip>,
}

/// Fetch and parse a glTF or GLB file together with its buffers and images.
///
/// `on_progress` only reports on the main file.
pub async fn load_scene(
    assets: &AssetConfig,
    on_progress: impl FnMut(Progress),
) -> anyhow::Result<SceneAsset> {
    let base = assets.base_path.as_str();
    let bytes = load_binary(base, &assets.file_name, on_progress).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("{} is not a valid glTF file", assets.file_name))?;

    let buffers = futures::future::try_join_all(gltf.buffers().map(|buffer| {
        let blob = gltf.blob.as_deref();
        async move {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => blob
                    .map(<[u8]>::to_vec)
                    .context("The binary chunk of the GLB file is missing")?,
                gltf::buffer::Source::Uri(uri) => load_binary(base, uri, |_| {}).await?,
            };
            if data.len() < buffer.length() {
                anyhow::bail!(
                    "Buffer {} holds {} bytes but {} were declared",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                );
            }
            Ok::<_, anyhow::Error>(data)
        }
    }))
    .await?;

    let images = futures::future::join_all(gltf.images().map(|source| {
        let buffers = &buffers;
        async move {
            let decoded = match source.source() {
                gltf::image::Source::View { view, mime_type } => {
                    let start = view.offset();
                    let end = start + view.length();
                    buffers[view.buffer().index()]
                        .get(start..end)
                        .context("Image view lies outside its buffer")
                        .and_then(|bytes| decode_image(bytes, Some(mime_type)))
                }
                gltf::image::Source::Uri { uri, mime_type } => match load_binary(base, uri, |_| {}).await {
                    Ok(bytes) => decode_image(&bytes, mime_type),
                    Err(e) => Err(e),
                },
            };
            decoded.unwrap_or_else(|e| {
                log::warn!("Image {} could not be loaded and is left blank: {e:#}", source.index());
                image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))
            })
        }
    }))
    .await;

    Ok(parse_document(&gltf.document, &buffers, images))
}

/// Build the scene graph of `document`. Node indices in the graph equal the
/// node indices of the document.
pub fn parse_document(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    images: Vec<image::RgbaImage>,
) -> SceneAsset {
    let mut graph = SceneGraph::new();

    for material in document.materials() {
        graph.add_material(read_material(&material, images.len()));
    }
    graph.images = images;
    let mut fallback_material = None;

    for node in document.nodes() {
        let (translation, [x, y, z, w], scale) = node.transform().decomposed();
        let local = Instance {
            position: Vector3::from(translation),
            rotation: Quaternion::new(w, x, y, z),
            scale: Vector3::from(scale),
        };
        let mut scene_node = Node::new(node.name().map(str::to_string), local);
        scene_node.children = node.children().map(|child| child.index()).collect();

        if let Some(mesh) = node.mesh() {
            let mesh_name = mesh.name().map_or_else(|| format!("mesh {}", mesh.index()), str::to_string);
            for primitive in mesh.primitives() {
                let name = format!("{mesh_name}/{}", primitive.index());
                let Some((vertices, indices)) = read_geometry(&primitive, buffers, &name) else {
                    continue;
                };
                let material = match primitive.material().index() {
                    Some(idx) => idx,
                    None => *fallback_material
                        .get_or_insert_with(|| graph.add_material(MaterialDesc::fallback())),
                };
                scene_node.meshes.push(MeshPrimitive {
                    name,
                    vertices,
                    indices,
                    material,
                    cast_shadow: false,
                    receive_shadow: false,
                });
            }
        }
        graph.add_node(scene_node);
    }

    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => graph.roots = scene.nodes().map(|node| node.index()).collect(),
        None => log::warn!("The file contains no scene, nothing will be shown"),
    }
    graph.update_world_transforms();

    let clips = read_animations(document, buffers);
    log::info!(
        "Parsed {} nodes, {} materials and {} animations",
        graph.nodes.len(),
        graph.materials.len(),
        clips.len()
    );

    SceneAsset { graph, clips }
}

fn read_material(material: &gltf::Material, image_count: usize) -> MaterialDesc {
    let pbr = material.pbr_metallic_roughness();
    let texture_ref = |texture: gltf::Texture, tex_coord: u32| read_texture(texture, tex_coord, image_count);
    let normal = material.normal_texture();
    let occlusion = material.occlusion_texture();
    MaterialDesc {
        name: material.name().map(str::to_string),
        // glTF factors are linear already
        base_color: Color::from(pbr.base_color_factor()),
        base_color_texture: pbr
            .base_color_texture()
            .and_then(|info| texture_ref(info.texture(), info.tex_coord())),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        metallic_roughness_texture: pbr
            .metallic_roughness_texture()
            .and_then(|info| texture_ref(info.texture(), info.tex_coord())),
        normal_texture: normal
            .as_ref()
            .and_then(|normal| texture_ref(normal.texture(), normal.tex_coord())),
        normal_scale: normal.as_ref().map_or(1.0, |normal| normal.scale()),
        occlusion_texture: occlusion
            .as_ref()
            .and_then(|occlusion| texture_ref(occlusion.texture(), occlusion.tex_coord())),
        occlusion_strength: occlusion.as_ref().map_or(1.0, |occlusion| occlusion.strength()),
        emissive: material.emissive_factor(),
        emissive_texture: material
            .emissive_texture()
            .and_then(|info| texture_ref(info.texture(), info.tex_coord())),
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
        double_sided: material.double_sided(),
    }
}

fn read_texture(texture: gltf::Texture, tex_coord: u32, image_count: usize) -> Option<TextureRef> {
    let image = texture.source().index();
    if image >= image_count {
        log::warn!("Texture {} refers to missing image {image}", texture.index());
        return None;
    }
    if tex_coord != 0 {
        log::warn!("Texture {} uses UV set {tex_coord}, the first set is used instead", texture.index());
    }
    Some(TextureRef {
        image,
        sampler: read_sampler(&texture.sampler()),
    })
}

/// Samplers without filters filter linearly. Mipmap filters reduce to their
/// texel filter because images are uploaded without mipmaps.
fn read_sampler(sampler: &gltf::texture::Sampler) -> SamplerDesc {
    use gltf::texture::{MagFilter, MinFilter, WrappingMode};

    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrappingMode::Repeat => wgpu::AddressMode::Repeat,
    };
    SamplerDesc {
        wrap_u: wrap(sampler.wrap_s()),
        wrap_v: wrap(sampler.wrap_t()),
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => wgpu::FilterMode::Nearest,
            Some(MagFilter::Linear) | None => wgpu::FilterMode::Linear,
        },
        min_filter: match sampler.min_filter() {
            Some(MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear) => {
                wgpu::FilterMode::Nearest
            }
            Some(
                MinFilter::Linear | MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear,
            )
            | None => wgpu::FilterMode::Linear,
        },
    }
}

/// Vertices and triangle indices of a primitive. Missing indices are
/// generated and missing normals are replaced by flat face normals.
fn read_geometry(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    name: &str,
) -> Option<(Vec<ModelVertex>, Vec<u32>)> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Primitive {name} is not a triangle list and is skipped");
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        log::warn!("Primitive {name} has no positions and is skipped");
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, tex_coords)| vertex.tex_coords = tex_coords);
    }

    let count = vertices.len() as u32;
    let mut indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..count).collect(),
    };
    let whole_triangles = indices.len() - indices.len() % 3;
    indices.truncate(whole_triangles);
    if indices.iter().any(|&idx| idx >= count) {
        log::warn!("Primitive {name} references missing vertices, those triangles are dropped");
        indices = indices
            .chunks_exact(3)
            .filter(|triangle| triangle.iter().all(|&idx| idx < count))
            .flatten()
            .copied()
            .collect();
    }

    match reader.read_normals() {
        Some(normals) => {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
            Some((vertices, indices))
        }
        None => Some(flat_shaded(&vertices, &indices)),
    }
}

/// Give every triangle its own three vertices carrying the face normal.
fn flat_shaded(vertices: &[ModelVertex], indices: &[u32]) -> (Vec<ModelVertex>, Vec<u32>) {
    let mut flat = Vec::with_capacity(indices.len());
    for triangle in indices.chunks_exact(3) {
        let corners = [
            vertices[triangle[0] as usize],
            vertices[triangle[1] as usize],
            vertices[triangle[2] as usize],
        ];
        let [a, b, c] = corners.map(|v| Vector3::from(v.position));
        let normal = (b - a).cross(c - a);
        let normal = if normal.magnitude2() > 0.0 {
            normal.normalize()
        } else {
            Vector3::unit_y()
        };
        flat.extend(corners.map(|vertex| ModelVertex {
            normal: normal.into(),
            ..vertex
        }));
    }
    let indices = (0..flat.len() as u32).collect();
    (flat, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3]) -> ModelVertex {
        ModelVertex {
            position,
            ..Default::default()
        }
    }

    #[test]
    fn flat_shading_duplicates_vertices_per_face() {
        let vertices = vec![
            vertex([0.0, 0.0, 0.0]),
            vertex([1.0, 0.0, 0.0]),
            vertex([0.0, 1.0, 0.0]),
            vertex([0.0, 0.0, 1.0]),
        ];
        let (flat, indices) = flat_shaded(&vertices, &[0, 1, 2, 0, 3, 1]);
        assert_eq!(flat.len(), 6);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(flat[..3].iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(flat[3..].iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    const TEXTURED: &str = r#"{
        "asset": {"version": "2.0"},
        "images": [{"uri": "hull.png"}, {"uri": "hull_orm.png"}],
        "samplers": [{"magFilter": 9728, "minFilter": 9987, "wrapS": 33071, "wrapT": 33648}],
        "textures": [{"source": 0, "sampler": 0}, {"source": 1}],
        "materials": [
            {
                "pbrMetallicRoughness": {
                    "baseColorTexture": {"index": 0},
                    "metallicRoughnessTexture": {"index": 1},
                    "metallicFactor": 0.5
                },
                "normalTexture": {"index": 0, "scale": 0.5},
                "occlusionTexture": {"index": 1, "strength": 0.25},
                "emissiveTexture": {"index": 0},
                "emissiveFactor": [1.0, 0.5, 0.0]
            },
            {}
        ]
    }"#;

    fn textured_materials(image_count: usize) -> Vec<MaterialDesc> {
        let gltf = gltf::Gltf::from_slice(TEXTURED.as_bytes()).unwrap();
        gltf.document.materials().map(|m| read_material(&m, image_count)).collect()
    }

    #[test]
    fn every_texture_slot_is_read() {
        let materials = textured_materials(2);
        let hull = &materials[0];
        assert_eq!(hull.base_color_texture.map(|t| t.image), Some(0));
        assert_eq!(hull.metallic_roughness_texture.map(|t| t.image), Some(1));
        assert_eq!(hull.normal_texture.map(|t| t.image), Some(0));
        assert_eq!(hull.normal_scale, 0.5);
        assert_eq!(hull.occlusion_texture.map(|t| t.image), Some(1));
        assert_eq!(hull.occlusion_strength, 0.25);
        assert_eq!(hull.emissive_texture.map(|t| t.image), Some(0));
        assert_eq!(hull.emissive, [1.0, 0.5, 0.0]);
        assert_eq!(hull.metalness, 0.5);
    }

    #[test]
    fn sampler_wrap_and_filter_modes_are_kept() {
        let materials = textured_materials(2);
        let sampler = materials[0].base_color_texture.unwrap().sampler;
        assert_eq!(sampler.wrap_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(sampler.wrap_v, wgpu::AddressMode::MirrorRepeat);
        assert_eq!(sampler.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(sampler.min_filter, wgpu::FilterMode::Linear);
        // texture without a sampler
        assert_eq!(materials[0].metallic_roughness_texture.unwrap().sampler, SamplerDesc::default());
    }

    #[test]
    fn untextured_materials_use_the_defaults() {
        let plain = &textured_materials(2)[1];
        assert_eq!(plain.normal_texture, None);
        assert_eq!(plain.normal_scale, 1.0);
        assert_eq!(plain.occlusion_strength, 1.0);
        assert_eq!(plain.emissive, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn textures_of_images_that_failed_to_load_are_dropped() {
        let hull = &textured_materials(1)[0];
        assert_eq!(hull.base_color_texture.map(|t| t.image), Some(0));
        assert_eq!(hull.metallic_roughness_texture, None);
        assert_eq!(hull.occlusion_texture, None);
    }

    #[test]
    fn degenerate_faces_point_up() {
        let vertices = vec![vertex([1.0, 1.0, 1.0]); 3];
        let (flat, _) = flat_shaded(&vertices, &[0, 1, 2]);
        assert!(flat.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }
}
