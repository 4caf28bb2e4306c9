#![allow(dead_code)]

//! Builds small binary glTF files in memory.
//!
//! Every mesh is the same triangle. Node `i` carries mesh `i` and is moved
//! `i` units along x. Animations all slide node 0 from x = 0 to x = 1.

use hero_scene::{
    color::Color,
    resources::{SceneAsset, parse_document},
};

const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
const INDICES: [u16; 3] = [0, 1, 2];
const TIMES: [f32; 2] = [0.0, 1.0];
const TRANSLATIONS: [[f32; 3]; 2] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];

#[derive(Clone, Debug, Default)]
pub struct GlbBuilder {
    /// Linear base color factors, one material each.
    materials: Vec<[f32; 4]>,
    /// Material of every mesh, `None` for no material.
    meshes: Vec<Option<usize>>,
    animations: usize,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material with the given sRGB color. Returns its index.
    pub fn material(&mut self, hex: u32) -> usize {
        self.materials.push(Color::from_hex(hex).to_array());
        self.materials.len() - 1
    }

    pub fn mesh(&mut self, material: Option<usize>) -> &mut Self {
        self.meshes.push(material);
        self
    }

    pub fn animations(&mut self, count: usize) -> &mut Self {
        self.animations = count;
        self
    }

    fn bin_chunk() -> Vec<u8> {
        let mut bin = Vec::new();
        POSITIONS.iter().flatten().for_each(|v| bin.extend(v.to_le_bytes()));
        INDICES.iter().for_each(|v| bin.extend(v.to_le_bytes()));
        bin.extend([0, 0]);
        TIMES.iter().for_each(|v| bin.extend(v.to_le_bytes()));
        TRANSLATIONS.iter().flatten().for_each(|v| bin.extend(v.to_le_bytes()));
        bin
    }

    /// glTF JSON whose single buffer is described by `buffer`.
    fn json_chunk(&self, buffer: &str) -> String {
        let materials: Vec<String> = self
            .materials
            .iter()
            .map(|[r, g, b, a]| {
                format!(r#"{{"pbrMetallicRoughness":{{"baseColorFactor":[{r:?},{g:?},{b:?},{a:?}]}}}}"#)
            })
            .collect();
        let meshes: Vec<String> = self
            .meshes
            .iter()
            .map(|material| {
                let material = material.map(|m| format!(r#","material":{m}"#)).unwrap_or_default();
                format!(r#"{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1{material}}}]}}"#)
            })
            .collect();
        let nodes: Vec<String> = (0..self.meshes.len())
            .map(|i| format!(r#"{{"mesh":{i},"translation":[{i}.0,0.0,0.0]}}"#))
            .collect();
        let roots: Vec<String> = (0..self.meshes.len()).map(|i| i.to_string()).collect();
        let animations: Vec<String> = (0..self.animations)
            .map(|i| {
                format!(
                    r#"{{"name":"clip {i}","channels":[{{"sampler":0,"target":{{"node":0,"path":"translation"}}}}],"samplers":[{{"input":2,"output":3,"interpolation":"LINEAR"}}]}}"#
                )
            })
            .collect();

        format!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[{roots}]}}],"nodes":[{nodes}],"meshes":[{meshes}],"materials":[{materials}],"animations":[{animations}],"buffers":[{buffer}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36,"target":34962}},{{"buffer":0,"byteOffset":36,"byteLength":6,"target":34963}},{{"buffer":0,"byteOffset":44,"byteLength":8}},{{"buffer":0,"byteOffset":52,"byteLength":24}}],"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}},{{"bufferView":2,"componentType":5126,"count":2,"type":"SCALAR","min":[0.0],"max":[1.0]}},{{"bufferView":3,"componentType":5126,"count":2,"type":"VEC3"}}]}}"#,
            roots = roots.join(","),
            nodes = nodes.join(","),
            meshes = meshes.join(","),
            materials = materials.join(","),
            animations = animations.join(","),
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bin = Self::bin_chunk();
        let mut json = self.json_chunk(&format!(r#"{{"byteLength":{}}}"#, bin.len())).into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend(b"glTF");
        glb.extend(2u32.to_le_bytes());
        glb.extend((total as u32).to_le_bytes());
        glb.extend((json.len() as u32).to_le_bytes());
        glb.extend(b"JSON");
        glb.extend(json);
        glb.extend((bin.len() as u32).to_le_bytes());
        glb.extend(b"BIN\0");
        glb.extend(bin);
        glb
    }
}

impl GlbBuilder {
    /// The same scene as a `.gltf` file with its buffer embedded as a
    /// base64 data URI.
    pub fn build_gltf(&self) -> String {
        use base64::Engine as _;

        let bin = Self::bin_chunk();
        let payload = base64::engine::general_purpose::STANDARD.encode(&bin);
        self.json_chunk(&format!(
            r#"{{"byteLength":{},"uri":"data:application/octet-stream;base64,{payload}"}}"#,
            bin.len()
        ))
    }
}

/// Parse a GLB file the way the loader does, without images.
pub fn parse(glb: &[u8]) -> SceneAsset {
    let gltf = gltf::Gltf::from_slice(glb).expect("test GLB should be valid");
    let blob = gltf.blob.clone().expect("test GLB should carry a binary chunk");
    parse_document(&gltf.document, &[blob], Vec::new())
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("hero-scene-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir should be writable");
    dir
}
