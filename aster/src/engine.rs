use std::sync::Arc;

use aster_renderer::{MeshHandle, RenderStatus, SceneRenderer, SceneShaderSources, Vertex};
use aster_rhi::{RenderContext, RhiError, vk};
use winit::window::Window;

use crate::RenderableApp;

pub struct Engine {
    // Declared renderer-first so every resource carved out of the context
    // tears down before the context itself.
    renderer: SceneRenderer,
    context: RenderContext,

    main_window: Arc<Window>,
    should_exit: bool,
}

impl Engine {
    pub fn new(
        main_window: Arc<Window>,
        shaders: &SceneShaderSources,
    ) -> Result<Self, anyhow::Error> {
        let context = RenderContext::new(&main_window)?;
        let renderer = SceneRenderer::new(&context, shaders)?;

        Ok(Self {
            renderer,
            context,
            main_window,
            should_exit: false,
        })
    }

    /// Draw and present one frame of the app's scene. A stale swapchain is
    /// handled here by resizing to the current window extent.
    #[profiling::function]
    pub fn render<A: RenderableApp>(&mut self, app: &mut A) -> Result<(), anyhow::Error> {
        let scene = app.scene();
        let status = self.renderer.render(&self.context, &scene)?;

        if status == RenderStatus::SwapchainStale {
            self.resize_to_window()?;
        }

        Ok(())
    }

    #[profiling::function]
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), anyhow::Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        let extent = vk::Extent2D { width, height };
        self.renderer.resize(&self.context, extent)?;
        Ok(())
    }

    fn resize_to_window(&mut self) -> Result<(), anyhow::Error> {
        let inner_size = self.main_window.inner_size();
        self.resize(inner_size.width, inner_size.height)
    }

    pub fn create_mesh(
        &mut self,
        name: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshHandle, RhiError> {
        self.renderer.create_mesh(&self.context, name, vertices, indices)
    }

    #[inline]
    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut SceneRenderer {
        &mut self.renderer
    }

    #[inline]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    #[inline]
    pub fn main_window(&self) -> &Arc<Window> {
        &self.main_window
    }

    #[inline]
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    #[inline]
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Field drops free live GPU resources; nothing may still be in flight.
        if let Err(error) = self.context.wait_until_idle() {
            log::warn!("device wait failed during engine teardown: {error}");
        }
    }
}
