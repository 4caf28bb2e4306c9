//! The GPU context: surface, device and every resource that lives as long as
//! the window does.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{CameraResources, Projection},
    config::ViewerConfig,
    controls::OrbitControls,
    data_structures::texture::Texture,
    pipelines::{Pipelines, light::LightResources},
};

#[derive(Debug)]
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub(crate) is_surface_configured: bool,
    /// MSAA sample count actually in use.
    pub sample_count: u32,
    pub(crate) depth_texture: Texture,
    /// Multisampled target resolved into the surface, absent without MSAA.
    pub(crate) msaa_target: Option<Texture>,
    pub camera: CameraResources,
    pub projection: Projection,
    pub lights: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can draw to this window")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colors and rely on an sRGB surface to encode them.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let sample_count = supported_sample_count(&adapter, surface_format, viewer.msaa_samples);

        let projection = Projection::new(
            config.width,
            config.height,
            viewer.camera.fovy,
            viewer.camera.znear,
            viewer.camera.zfar,
        );
        let controls = OrbitControls::new(viewer.controls.clone(), config.height);
        let camera = CameraResources::new(&device, &viewer.camera, controls, &projection);
        let lights = LightResources::new(&device, &viewer.lights, viewer.shadow_map_size);
        let pipelines = Pipelines::new(
            &device,
            surface_format,
            sample_count,
            &camera.bind_group_layout,
            &lights,
        );

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_target = (sample_count > 1)
            .then(|| Texture::create_msaa_target(&device, [config.width, config.height], config.format, sample_count));

        let mut ctx = Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            sample_count,
            depth_texture,
            msaa_target,
            camera,
            projection,
            lights,
            pipelines,
            clear_colour: viewer.clear_colour.into(),
        };
        ctx.resize(size.width, size.height);
        Ok(ctx)
    }

    /// Match the output buffers and the projection to a new window size.
    /// Zero sized windows are ignored until they become visible again.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(sizes) = OutputSizes::for_window(width, height, self.sample_count) else {
            return;
        };
        let [width, height] = sizes.surface;
        self.config.width = width;
        self.config.height = height;
        self.projection.resize(width, height);
        self.camera.controls.resize(height);
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        self.depth_texture =
            Texture::create_depth_texture(&self.device, sizes.depth, self.sample_count, "depth_texture");
        self.msaa_target = sizes.msaa.map(|size| {
            Texture::create_msaa_target(&self.device, size, self.config.format, self.sample_count)
        });
        log::debug!("Resized output to {width}x{height}");
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

/// Dimensions of the surface and of the buffers drawn into alongside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputSizes {
    pub surface: [u32; 2],
    pub depth: [u32; 2],
    /// Absent without MSAA.
    pub msaa: Option<[u32; 2]>,
}

impl OutputSizes {
    /// `None` for a zero sized window, whose resize is skipped.
    pub fn for_window(width: u32, height: u32, sample_count: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let size = [width, height];
        Some(Self {
            surface: size,
            depth: size,
            msaa: (sample_count > 1).then_some(size),
        })
    }
}

/// `requested` if the format can be multisampled that often, 1 otherwise.
fn supported_sample_count(adapter: &wgpu::Adapter, format: wgpu::TextureFormat, requested: u32) -> u32 {
    if requested <= 1 {
        return 1;
    }
    let flags = adapter.get_texture_format_features(format).flags;
    if flags.sample_count_supported(requested) {
        requested
    } else {
        log::warn!("{requested}x MSAA is not supported for {format:?}, rendering without it");
        1
    }
}
