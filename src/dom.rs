//! Page integration on the web: mounting the canvas, hiding the loading
//! indicator and the scroll and resize listeners.
//!
//! Listeners live as long as the page does, so their closures are leaked.

use std::sync::Arc;

use anyhow::Context as _;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use winit::{dpi::LogicalSize, window::Window};

use crate::{config::DomConfig, scroll::transform_css};

fn js_error(value: JsValue) -> anyhow::Error {
    anyhow::anyhow!("{value:?}")
}

fn page() -> anyhow::Result<web_sys::Window> {
    web_sys::window().context("Not running in a browser window")
}

fn element<T: JsCast>(id: &str) -> anyhow::Result<T> {
    page()?
        .document()
        .context("The page has no document")?
        .get_element_by_id(id)
        .with_context(|| format!("Element #{id} does not exist"))?
        .dyn_into::<T>()
        .map_err(|_| anyhow::anyhow!("Element #{id} is not of the expected type"))
}

/// Size of the browser viewport in CSS pixels.
pub fn viewport_size() -> anyhow::Result<LogicalSize<f64>> {
    let page = page()?;
    let width = page.inner_width().map_err(js_error)?.as_f64();
    let height = page.inner_height().map_err(js_error)?.as_f64();
    match (width, height) {
        (Some(width), Some(height)) => Ok(LogicalSize::new(width, height)),
        _ => anyhow::bail!("The viewport size is not a number"),
    }
}

/// Append the canvas of `window` to the element with id `mount_id`.
pub fn mount_canvas(window: &Window, mount_id: &str) -> anyhow::Result<()> {
    use winit::platform::web::WindowExtWebSys;

    let canvas = window.canvas().context("The window has no canvas")?;
    let mount: web_sys::Element = element(mount_id)?;
    mount.append_child(&canvas).map_err(js_error)?;
    log::info!("Mounted the canvas into #{mount_id}");
    Ok(())
}

pub fn hide(id: &str) -> anyhow::Result<()> {
    let element: web_sys::HtmlElement = element(id)?;
    element
        .style()
        .set_property("display", "none")
        .map_err(js_error)
}

/// Slide the mount element down while the page scrolls from the hero
/// section to the about section. Element geometry is read on every event.
pub fn listen_for_scroll(dom: &DomConfig) -> anyhow::Result<()> {
    let page = page()?;
    let mount: web_sys::HtmlElement = element(&dom.mount_id)?;
    let hero: web_sys::Element = element(&dom.hero_id)?;
    let about: web_sys::HtmlElement = element(&dom.about_id)?;
    let max_offset_px = dom.max_offset_px;

    let scrolled = page.clone();
    let on_scroll = Closure::<dyn FnMut()>::new(move || {
        let scroll_y = scrolled.scroll_y().unwrap_or(0.0);
        let css = transform_css(
            scroll_y,
            f64::from(hero.client_height()),
            f64::from(about.offset_top()),
            max_offset_px,
        );
        if let Err(e) = mount.style().set_property("transform", &css) {
            log::warn!("Could not move the model: {e:?}");
        }
    });
    page.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())
        .map_err(js_error)?;
    on_scroll.forget();
    Ok(())
}

/// Keep the window as large as the viewport. winit reports the new size as
/// a regular resize event.
pub fn listen_for_resize(window: Arc<Window>) -> anyhow::Result<()> {
    let on_resize = Closure::<dyn FnMut()>::new(move || match viewport_size() {
        Ok(size) => {
            let _ = window.request_inner_size(size);
        }
        Err(e) => log::warn!("Ignoring resize: {e:#}"),
    });
    page()?
        .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        .map_err(js_error)?;
    on_resize.forget();
    Ok(())
}
