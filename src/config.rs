//! Viewer configuration.
//!
//! Every constant the hero banner depends on lives here so the setup code reads
//! as plain wiring. [`ViewerConfig::default`] reproduces the banner as shipped;
//! the `with_*` methods exist for embedding the viewer into other pages.

use cgmath::{Deg, Point3, Rad, Vector3};

use crate::{color::Color, pipelines::light::LightRig, recolor::MaterialOverride};

/// Ids of the page elements the viewer talks to.
#[derive(Clone, Debug)]
pub struct DomConfig {
    /// Element the canvas is appended to. Also the element the scroll
    /// transition translates.
    pub mount_id: String,
    /// Element hidden once the model is loaded.
    pub progress_id: String,
    pub hero_id: String,
    pub about_id: String,
    /// Translation in CSS pixels once the about section is reached.
    pub max_offset_px: f64,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            mount_id: "hero-3d-model".to_string(),
            progress_id: "progress-container".to_string(),
            hero_id: "hero".to_string(),
            about_id: "about".to_string(),
            max_offset_px: 100.0,
        }
    }
}

/// Where the model lives. Buffers and images referenced by the model are
/// resolved relative to `base_path`.
#[derive(Clone, Debug)]
pub struct AssetConfig {
    pub base_path: String,
    pub file_name: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_path: "public/space_station_3/".to_string(),
            file_name: "scene.gltf".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: Point3<f32>,
    /// Vertical field of view.
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Point3::new(4.0, 5.0, 11.0),
            fovy: Deg(45.0),
            znear: 1.0,
            zfar: 1000.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControlsConfig {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: Rad<f32>,
    pub max_polar_angle: Rad<f32>,
    pub auto_rotate: bool,
    /// Degrees per second when `auto_rotate` is on.
    pub auto_rotate_speed: Deg<f32>,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 1.0, 0.0),
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: false,
            enable_zoom: true,
            min_distance: 5.0,
            max_distance: 20.0,
            min_polar_angle: Rad(0.5),
            max_polar_angle: Rad(1.5),
            auto_rotate: false,
            auto_rotate_speed: Deg(12.0),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub dom: DomConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lights: LightRig,
    pub material_override: MaterialOverride,
    /// Where the loaded hierarchy is placed in the scene.
    pub model_offset: Vector3<f32>,
    pub clear_colour: Color,
    /// Requested MSAA sample count. Falls back to 1 when the surface format
    /// cannot be multisampled.
    pub msaa_samples: u32,
    pub shadow_map_size: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dom: DomConfig::default(),
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lights: LightRig::default(),
            material_override: MaterialOverride::default(),
            model_offset: Vector3::new(0.0, 1.05, -1.0),
            clear_colour: Color::BLACK,
            msaa_samples: 4,
            shadow_map_size: 512,
        }
    }
}

impl ViewerConfig {
    /// Defaults with the asset location taken from `HERO_SCENE_ASSET_DIR` and
    /// `HERO_SCENE_ASSET_FILE` when they are set.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("HERO_SCENE_ASSET_DIR") {
            log::info!("Using asset directory {dir} from the environment");
            config.assets.base_path = dir;
        }
        if let Ok(file) = std::env::var("HERO_SCENE_ASSET_FILE") {
            log::info!("Using asset file {file} from the environment");
            config.assets.file_name = file;
        }
        config
    }

    pub fn with_assets(mut self, base_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.assets = AssetConfig {
            base_path: base_path.into(),
            file_name: file_name.into(),
        };
        self
    }
}
