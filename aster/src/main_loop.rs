use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::Engine;
use crate::app::RenderableApp;

pub struct EngineLoop<A> {
    engine: Option<Engine>,
    app: A,

    frame_count: u64,
    last_tick: Instant,
    last_fps_report: Instant,
}

impl<A: RenderableApp> ApplicationHandler for EngineLoop<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("Aster")
            .with_min_inner_size(LogicalSize::new(32, 32))
            .with_inner_size(LogicalSize::new(1920, 1080));

        // The handler offers no way to surface errors, so startup failures
        // abort here.
        let main_window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create the main window"),
        );

        let shaders = self
            .app
            .shader_sources()
            .expect("failed to load shader binaries");
        let mut engine =
            Engine::new(main_window.clone(), &shaders).expect("failed to initialize the engine");

        self.app
            .prepare(&mut engine)
            .expect("app preparation failed");
        self.engine = Some(engine);

        main_window.request_redraw();
    }

    #[profiling::function]
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.engine.as_ref().is_some_and(Engine::should_exit) {
            event_loop.exit();
            return;
        }

        self.process_window_event(&event);
    }

    #[profiling::function]
    fn device_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if self.engine.as_ref().is_some_and(Engine::should_exit) {
            event_loop.exit();
            return;
        }

        self.app.on_device_event(&event);
    }
}

impl<A: RenderableApp> EngineLoop<A> {
    pub(super) fn new(app: A) -> Result<Self, anyhow::Error> {
        Ok(Self {
            engine: None,
            app,

            frame_count: 0,
            last_tick: Instant::now(),
            last_fps_report: Instant::now(),
        })
    }

    pub fn run(mut self) -> Result<(), anyhow::Error> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    #[profiling::function("main_loop")]
    fn process_window_event(&mut self, event: &WindowEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        self.app.on_window_event(event, engine.main_window().as_ref());

        match event {
            WindowEvent::Resized(_) => {
                let inner_size = engine.main_window().inner_size();
                if let Err(error) = engine.resize(inner_size.width, inner_size.height) {
                    error!("Resize failed: {error}");
                    engine.request_exit();
                }
                self.app.resize(inner_size.width, inner_size.height);
            }
            WindowEvent::CloseRequested => {
                engine.request_exit();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    #[profiling::function]
    fn redraw(&mut self) {
        let delta_time = {
            let now = Instant::now();
            let delta_time = (now - self.last_tick).as_secs_f32();
            self.last_tick = now;

            self.frame_count += 1;
            let since_report = (now - self.last_fps_report).as_secs_f32();
            if since_report > 1. {
                info!(
                    "Frame rate: {:.1} fps",
                    self.frame_count as f32 / since_report
                );
                self.last_fps_report = now;
                self.frame_count = 0;
            }

            delta_time
        };

        self.app.tick(delta_time);

        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Err(error) = engine.render(&mut self.app) {
            error!("Frame failed: {error}");
            engine.request_exit();
        }

        engine.main_window().request_redraw();
        profiling::finish_frame!();
    }
}
