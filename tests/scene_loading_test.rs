use hero_scene::{
    ViewerConfig,
    config::AssetConfig,
    resources::{fetch::Progress, load_scene},
    viewer::prepare_model,
};

mod common;

use common::GlbBuilder;

const BROWN: u32 = 0x8B4513;
const GREEN: u32 = 0x228B22;
const DEEP_BLUE: u32 = 0x00008B;

fn hull_with_trim() -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let brown = builder.material(BROWN);
    let green = builder.material(GREEN);
    builder.mesh(Some(brown)).mesh(Some(green)).mesh(Some(brown)).mesh(None);
    builder.build()
}

#[test]
fn every_mesh_casts_and_receives_shadows() {
    let prepared = prepare_model(common::parse(&hull_with_trim()), &ViewerConfig::default());
    let meshes: Vec<_> = prepared.graph.meshes().map(|(_, mesh)| mesh).collect();
    assert_eq!(meshes.len(), 4);
    assert!(meshes.iter().all(|mesh| mesh.cast_shadow && mesh.receive_shadow));
}

#[test]
fn brown_meshes_turn_deep_blue_and_others_keep_their_material() {
    let prepared = prepare_model(common::parse(&hull_with_trim()), &ViewerConfig::default());
    let graph = &prepared.graph;
    let colors: Vec<u32> = (0..4)
        .map(|node| graph.materials[graph.nodes[node].meshes[0].material].base_color.to_hex())
        .collect();
    assert_eq!(colors, vec![DEEP_BLUE, GREEN, DEEP_BLUE, 0xFFFFFF]);

    let blue = &graph.materials[graph.nodes[0].meshes[0].material];
    assert_eq!(blue.metalness, 0.8);
    assert_eq!(blue.roughness, 0.3);
    // both brown meshes share the one replacement
    assert_eq!(graph.nodes[0].meshes[0].material, graph.nodes[2].meshes[0].material);
}

#[test]
fn model_without_animations_gets_no_mixer() {
    let prepared = prepare_model(common::parse(&hull_with_trim()), &ViewerConfig::default());
    assert!(prepared.mixer.is_none());
}

#[test]
fn one_looping_action_per_clip() {
    let mut builder = GlbBuilder::new();
    builder.mesh(None).animations(3);
    let prepared = prepare_model(common::parse(&builder.build()), &ViewerConfig::default());

    let mixer = prepared.mixer.expect("animated model should get a mixer");
    let names: Vec<_> = mixer.actions().iter().map(|a| a.clip().name.as_str()).collect();
    assert_eq!(names, vec!["clip 0", "clip 1", "clip 2"]);
    assert!(mixer.actions().iter().all(|a| a.is_playing() && a.looping));
}

#[test]
fn animation_moves_the_node_inside_the_offset_model() {
    let mut builder = GlbBuilder::new();
    builder.mesh(None).animations(1);
    let config = ViewerConfig::default();
    let mut prepared = prepare_model(common::parse(&builder.build()), &config);
    let mixer = prepared.mixer.as_mut().expect("animated model should get a mixer");

    mixer.update(0.5, &mut prepared.graph);

    let world = prepared.graph.nodes[0].world_position();
    assert!((world.x - (config.model_offset.x + 0.5)).abs() < 1e-5);
    assert!((world.y - config.model_offset.y).abs() < 1e-5);
    assert!((world.z - config.model_offset.z).abs() < 1e-5);
}

#[test]
fn missing_normals_are_generated() {
    let asset = common::parse(&hull_with_trim());
    let mesh = &asset.graph.nodes[0].meshes[0];
    assert_eq!(mesh.indices.len(), 3);
    assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}

#[tokio::test]
async fn loads_a_glb_file_from_disk() {
    let dir = common::temp_dir("load");
    std::fs::write(dir.join("hull.glb"), hull_with_trim()).unwrap();
    let assets = AssetConfig {
        base_path: format!("{}/", dir.display()),
        file_name: "hull.glb".to_string(),
    };

    let mut reports: Vec<Progress> = Vec::new();
    let asset = load_scene(&assets, |progress| reports.push(progress))
        .await
        .expect("GLB on disk should load");

    assert_eq!(asset.graph.roots, vec![0, 1, 2, 3]);
    assert_eq!(reports.last().and_then(Progress::percent), Some(100.0));
}

#[tokio::test]
async fn embedded_base64_buffers_load() {
    let dir = common::temp_dir("embedded");
    let mut builder = GlbBuilder::new();
    let brown = builder.material(BROWN);
    builder.mesh(Some(brown)).animations(1);
    std::fs::write(dir.join("scene.gltf"), builder.build_gltf()).unwrap();
    let assets = AssetConfig {
        base_path: format!("{}/", dir.display()),
        file_name: "scene.gltf".to_string(),
    };

    let asset = load_scene(&assets, |_| {}).await.expect("embedded buffers should load");

    let mesh = &asset.graph.nodes[0].meshes[0];
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.indices.len(), 3);
    assert_eq!(asset.clips.len(), 1);
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = common::temp_dir("missing");
    let assets = AssetConfig {
        base_path: format!("{}/", dir.display()),
        file_name: "nowhere.gltf".to_string(),
    };
    let error = load_scene(&assets, |_| {}).await.unwrap_err();
    assert!(format!("{error:#}").contains("nowhere.gltf"));
}
