//! The hero banner itself: GPU context, the loaded model and its animations.
//!
//! A [`Viewer`] renders from the first frame on. The model arrives later
//! through [`Viewer::on_model_loaded`]; until then only the clear colour is
//! drawn.

use std::sync::Arc;

use winit::{event::WindowEvent, window::Window};

use crate::{
    animation::{AnimationMixer, Clock},
    camera::CameraResources,
    config::ViewerConfig,
    context::Context,
    data_structures::{model::Model, scene_graph::SceneGraph},
    render::render_frame,
    resources::SceneAsset,
};

/// A loaded model after the load-time rules ran, ready for upload.
#[derive(Debug)]
pub struct PreparedModel {
    pub graph: SceneGraph,
    /// Present only when the model carries animation clips.
    pub mixer: Option<AnimationMixer>,
}

/// Recolor the model, enable shadows, move it into place and start every
/// animation clip it carries.
pub fn prepare_model(asset: SceneAsset, config: &ViewerConfig) -> PreparedModel {
    let SceneAsset { mut graph, clips } = asset;

    config.material_override.apply(&mut graph);
    graph.wrap_roots("model", config.model_offset.into());
    graph.update_world_transforms();

    let mixer = (!clips.is_empty()).then(|| {
        let mut mixer = AnimationMixer::new();
        for clip in clips {
            log::debug!("Playing animation {:?} ({:.2}s)", clip.name, clip.duration);
            mixer.clip_action(clip).play();
        }
        mixer
    });

    PreparedModel { graph, mixer }
}

#[derive(Debug)]
struct LoadedModel {
    scene: PreparedModel,
    gpu: Model,
}

#[derive(Debug)]
pub struct Viewer {
    pub ctx: Context,
    config: ViewerConfig,
    loaded: Option<LoadedModel>,
    clock: Clock,
}

impl Viewer {
    /// Set up the GPU context for `window`. On the web the page listeners
    /// are registered as well.
    pub async fn new(window: Arc<Window>, config: ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, &config).await?;

        #[cfg(target_arch = "wasm32")]
        {
            crate::dom::listen_for_scroll(&config.dom)?;
            crate::dom::listen_for_resize(ctx.window.clone())?;
        }

        log::info!("Viewer ready, rendering at {:?}", ctx.size());
        Ok(Self {
            ctx,
            config,
            loaded: None,
            clock: Clock::new(),
        })
    }

    /// Take over the result of the asset load. A failed load is logged and
    /// the scene stays empty for good.
    pub fn on_model_loaded(&mut self, result: anyhow::Result<SceneAsset>) {
        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                log::error!("Error loading model: {e:#}");
                return;
            }
        };

        let scene = prepare_model(asset, &self.config);
        let gpu = Model::upload(
            &self.ctx.device,
            &self.ctx.queue,
            &scene.graph,
            &self.ctx.pipelines.material_layout,
        );
        self.loaded = Some(LoadedModel { scene, gpu });

        #[cfg(target_arch = "wasm32")]
        if let Err(e) = crate::dom::hide(&self.config.dom.progress_id) {
            log::warn!("Could not hide the loading indicator: {e:#}");
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.ctx.camera.controls.handle_window_events(event);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Advance animations and controls by the time since the last frame,
    /// then draw.
    pub fn on_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let dt = self.clock.delta();

        if let Some(LoadedModel { scene, gpu }) = &mut self.loaded {
            if let Some(mixer) = &mut scene.mixer {
                mixer.update(dt, &mut scene.graph);
                gpu.write_to_buffers(&self.ctx.queue, &scene.graph);
            }
        }

        let CameraResources { camera, controls, .. } = &mut self.ctx.camera;
        controls.update(camera, dt);
        self.ctx
            .camera
            .write_to_buffer(&self.ctx.queue, &self.ctx.projection);

        render_frame(&self.ctx, self.loaded.as_ref().map(|loaded| &loaded.gpu))
    }
}
