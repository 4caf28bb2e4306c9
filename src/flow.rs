//! Application event loop.
//!
//! [`run`] opens the window and hands control to winit. The winit handler
//! owns the [`Viewer`] and is the only place it is touched from; work that
//! finishes elsewhere (GPU setup on the web, the asset load) comes back as a
//! [`ViewerEvent`].
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the viewer, then starts the asset load
//! 2. every `RedrawRequested` advances animations and controls and draws
//! 3. `ModelLoaded` hands the parsed asset to the viewer

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    resources::{SceneAsset, fetch::log_progress, load_scene},
    viewer::Viewer,
};

pub enum ViewerEvent {
    /// The viewer finished its asynchronous setup.
    #[cfg(target_arch = "wasm32")]
    Initialized(anyhow::Result<Box<Viewer>>),
    ModelLoaded(anyhow::Result<SceneAsset>),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().map(|_| "Viewer"))
                .finish(),
            Self::ModelLoaded(result) => f
                .debug_tuple("ModelLoaded")
                .field(&result.as_ref().map(|asset| asset.graph.nodes.len()))
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    viewer: Option<Viewer>,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            viewer: None,
        })
    }

    /// Start fetching the model. The result arrives as
    /// [`ViewerEvent::ModelLoaded`] while frames keep being drawn.
    fn start_loading(&self) {
        let assets = self.config.assets.clone();
        let proxy = self.proxy.clone();
        log::info!("Loading {}{}", assets.base_path, assets.file_name);
        let load = async move {
            let result = load_scene(&assets, log_progress).await;
            if proxy.send_event(ViewerEvent::ModelLoaded(result)).is_err() {
                log::warn!("The event loop closed before the model finished loading");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    fn start(&mut self, viewer: Viewer) {
        viewer.ctx.window.request_redraw();
        self.viewer = Some(viewer);
        self.start_loading();
    }
}

/// Startup failures end the program. On the web they surface as a thrown
/// exception.
fn fail(event_loop: &ActiveEventLoop, error: anyhow::Error) {
    log::error!("Startup failed: {error:#}");
    event_loop.exit();
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen::throw_str(&format!("{error:#}"));
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("hero-scene");

        #[cfg(target_arch = "wasm32")]
        {
            match crate::dom::viewport_size() {
                Ok(size) => window_attributes = window_attributes.with_inner_size(size),
                Err(e) => return fail(event_loop, e),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return fail(event_loop, e.into()),
        };

        #[cfg(target_arch = "wasm32")]
        if let Err(e) = crate::dom::mount_canvas(&window, &self.config.dom.mount_id) {
            return fail(event_loop, e);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let viewer = self
                .async_runtime
                .block_on(Viewer::new(window, self.config.clone()));
            match viewer {
                Ok(viewer) => self.start(viewer),
                Err(e) => fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let viewer = Viewer::new(window, config).await.map(Box::new);
                if proxy.send_event(ViewerEvent::Initialized(viewer)).is_err() {
                    log::error!("The event loop closed during startup");
                }
            });
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(unused_variables))]
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(result) => match result {
                Ok(mut viewer) => {
                    // The canvas may have been resized while the GPU was set up
                    let size = viewer.ctx.window.inner_size();
                    viewer.resize(size.width, size.height);
                    self.start(*viewer);
                }
                Err(e) => fail(event_loop, e),
            },
            ViewerEvent::ModelLoaded(result) => match &mut self.viewer {
                Some(viewer) => viewer.on_model_loaded(result),
                None => log::warn!("Model arrived before the viewer was ready and is dropped"),
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let viewer = match &mut self.viewer {
            Some(viewer) => viewer,
            None => return,
        };

        viewer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                // invoke main render loop
                viewer.ctx.window.request_redraw();
                match viewer.on_frame() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = viewer.ctx.window.inner_size();
                        viewer.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }
            }
            _ => {}
        }
    }
}

/// Open the viewer and run until the window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {e}");
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
