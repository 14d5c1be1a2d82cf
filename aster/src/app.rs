use aster_core::cli::EngineArgs;
use aster_renderer::{SceneShaderSources, SceneView};
use winit::event::{DeviceEvent, WindowEvent};
use winit::window::Window;

use crate::Engine;

pub trait App: Sized + 'static {
    fn new(args: &EngineArgs) -> anyhow::Result<Self>;
    fn on_window_event(&mut self, _event: &WindowEvent, _window: &Window) {}
    fn on_device_event(&mut self, _event: &DeviceEvent) {}
    fn tick(&mut self, _delta_time: f32) {}
}

/// An [`App`] that draws through the engine-owned scene renderer.
pub trait RenderableApp: App {
    /// SPIR-V binaries handed to the renderer at startup.
    fn shader_sources(&self) -> anyhow::Result<SceneShaderSources> {
        Ok(SceneShaderSources::load_from_dir("content/shaders")?)
    }

    /// One-time GPU setup, called once the engine exists.
    fn prepare(&mut self, _engine: &mut Engine) -> anyhow::Result<()> {
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Camera matrices and objects to draw this frame.
    fn scene(&mut self) -> SceneView<'_>;
}
