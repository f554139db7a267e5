#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = native::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::any::Any;
    use std::fmt;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use clap::Parser;
    use log::{info, warn};
    use pollster::block_on;
    use winit::dpi::LogicalSize;
    use winit::event_loop::{ControlFlow, EventLoop};
    use winit::window::Window;

    use frosted_glass::{
        app, AnimationLoop, AppContext, AssetLoader, CliOptions, EffectComposer, FrameClock,
        FrameScheduler, HeadlessBackend, ManualTime, Renderer, SceneAssets, SceneBuilder,
        SessionConfig,
    };

    pub fn run() -> Result<()> {
        let options = CliOptions::parse();
        let config = options.session_config();
        if !config.asset_root_exists() {
            warn!(
                "asset directory {} not found; textures will be missing",
                config.asset_root
            );
        }

        if options.summary_only {
            run_headless(config, options.frames, options.frame_time)
        } else {
            match run_interactive(config.clone()) {
                Ok(()) => Ok(()),
                Err(err) => {
                    if err.downcast_ref::<WindowInitError>().is_some() {
                        eprintln!(
                            "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                        );
                        run_headless(config, options.frames, options.frame_time)
                    } else {
                        Err(err)
                    }
                }
            }
        }
    }

    /// Never schedules anything; the headless loop below drives every frame.
    struct Unscheduled;

    impl FrameScheduler for Unscheduled {
        fn schedule_next_frame(&self) {}
    }

    fn run_headless(config: SessionConfig, frames: u32, frame_time: f64) -> Result<()> {
        let time = ManualTime::new();
        let mut context = AppContext::with_manual_time(config, time.clone());
        let mut scene = SceneBuilder::build(&context);
        let mut controls = SceneBuilder::controls(&scene);
        let composer = EffectComposer::new(context.viewport.width, context.viewport.height);
        let mut backend = HeadlessBackend::new(context.viewport);

        let mut assets = SceneAssets::start(&AssetLoader::new(&context.config));
        assets.finish(&context.material, &mut backend);

        let mut animation = AnimationLoop::new();
        for frame in 0..frames {
            if frame > 0 {
                time.advance(frame_time);
            }
            animation
                .tick(
                    &mut context,
                    &mut scene,
                    &mut controls,
                    &composer,
                    &mut backend,
                    &Unscheduled,
                )
                .with_context(|| format!("frame {frame} failed"))?;
        }

        app::print_final_state(&context, &scene, &composer, &assets, backend.frames_presented());
        Ok(())
    }

    fn run_interactive(config: SessionConfig) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;

        let (width, height) = config.initial_size;
        #[allow(deprecated)]
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Frosted Glass")
                        .with_inner_size(LogicalSize::new(width as f64, height as f64)),
                )
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let context = AppContext::new(config, app::window_viewport(&window), FrameClock::system());
        let scene = SceneBuilder::build(&context);
        let renderer = block_on(Renderer::new(Arc::clone(&window), &context, &scene))?;
        info!(
            "session started at {}x{} (pixel ratio {})",
            context.viewport.width,
            context.viewport.height,
            context.viewport.pixel_ratio()
        );

        let mut app = app::App::new(window, context, scene, renderer);
        app.start();

        let mut last_error = None;
        #[allow(deprecated)]
        event_loop
            .run(|event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);
                if let Err(err) = app.process_event(&event, elwt) {
                    last_error = Some(err);
                    elwt.exit();
                }
            })
            .context("event loop failed")?;

        info!("rendered {} frame(s)", app.frames());
        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
