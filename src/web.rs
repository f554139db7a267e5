#![cfg(target_arch = "wasm32")]

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gloo_events::EventListener;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::web::{EventLoopExtWebSys, WindowAttributesExtWebSys};
use winit::window::Window;

use crate::app::{window_viewport, App};
use crate::config::{SessionConfig, CANVAS_SELECTOR};
use crate::{AppContext, FrameClock, Renderer, SceneBuilder};

#[wasm_bindgen(start)]
pub async fn bootstrap() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    run()
        .await
        .map_err(|err| JsValue::from_str(&format!("session failed: {err:?}")))
}

async fn run() -> Result<()> {
    let window = web_sys::window().ok_or_else(|| anyhow!("missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("missing document"))?;
    let fragment = window.location().hash().unwrap_or_default();
    let config = SessionConfig::from_fragment(&fragment);

    let canvas: HtmlCanvasElement = document
        .query_selector(CANVAS_SELECTOR)
        .map_err(|_| anyhow!("invalid canvas selector {CANVAS_SELECTOR}"))?
        .ok_or_else(|| anyhow!("no element matches {CANVAS_SELECTOR}"))?
        .dyn_into()
        .map_err(|_| anyhow!("{CANVAS_SELECTOR} is not a canvas"))?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let (width, height) = inner_size(&window).unwrap_or(config.initial_size);
    #[allow(deprecated)]
    let surface_window = Arc::new(
        event_loop
            .create_window(
                Window::default_attributes()
                    .with_canvas(Some(canvas))
                    .with_title("Frosted Glass")
                    .with_inner_size(LogicalSize::new(width as f64, height as f64)),
            )
            .context("failed to create window")?,
    );

    let resize_target = Arc::clone(&surface_window);
    let resize_listener = EventListener::new(&window, "resize", move |_| {
        if let Some(browser) = web_sys::window() {
            if let Some((width, height)) = inner_size(&browser) {
                let _ = resize_target.request_inner_size(LogicalSize::new(width as f64, height as f64));
            }
        }
    });

    let context = AppContext::new(config, window_viewport(&surface_window), FrameClock::system());
    let scene = SceneBuilder::build(&context);
    let renderer = Renderer::new(Arc::clone(&surface_window), &context, &scene).await?;
    log::info!(
        "session started at {}x{} (debug panel {})",
        context.viewport.width,
        context.viewport.height,
        if context.debug() { "on" } else { "off" }
    );

    let mut app = App::new(surface_window, context, scene, renderer);
    app.start();

    #[allow(deprecated)]
    event_loop.spawn(move |event, elwt| {
        let _keep_alive = &resize_listener;
        elwt.set_control_flow(ControlFlow::Wait);
        if let Err(err) = app.process_event(&event, elwt) {
            log::error!("frame failed: {err:?}");
            elwt.exit();
        }
    });
    Ok(())
}

/// Browser viewport size in CSS pixels.
fn inner_size(window: &web_sys::Window) -> Option<(u32, u32)> {
    let width = window.inner_width().ok()?.as_f64()?;
    let height = window.inner_height().ok()?.as_f64()?;
    Some((width as u32, height as u32))
}
