//! Window surface - the bridge between winit and the Vulkan presentation
//! engine.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::{Arc, Weak};
use winit::window::Window;

use crate::core::RhiCore;
use crate::error::RhiError;

/// Everything the surface reports about itself for one adapter.
///
/// Captured in one call so swapchain construction and adapter selection see
/// a consistent snapshot.
pub struct SurfaceProperties {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceProperties {
    /// A surface with no formats or no present modes cannot be rendered to.
    pub fn is_renderable(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// A presentable surface tied to a winit window.
///
/// Holds the window weakly so closing the window is observable as
/// [`RhiError::WindowLost`] instead of keeping it alive from the render side.
pub struct WindowSurface {
    window: Weak<Window>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
}

impl WindowSurface {
    #[profiling::function]
    pub fn new(core: &RhiCore, window: &Arc<Window>) -> Result<Self, RhiError> {
        let surface_loader = ash::khr::surface::Instance::new(core.entry(), core.instance());

        let surface = unsafe {
            ash_window::create_surface(
                core.entry(),
                core.instance(),
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?
        };

        Ok(Self {
            window: Arc::downgrade(window),
            surface_loader,
            surface,
        })
    }

    /// Get the window this surface presents to.
    pub fn window(&self) -> Result<Arc<Window>, RhiError> {
        self.window.upgrade().ok_or(RhiError::WindowLost)
    }

    /// Current framebuffer size in pixels.
    pub fn framebuffer_extent(&self) -> Result<vk::Extent2D, RhiError> {
        let size = self.window()?.inner_size();
        Ok(vk::Extent2D {
            width: size.width,
            height: size.height,
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Whether the given queue family of an adapter can present to this
    /// surface.
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool, RhiError> {
        let supported = unsafe {
            self.surface_loader.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                self.surface,
            )?
        };
        Ok(supported)
    }

    /// Capabilities only; resize paths re-query these every time.
    pub fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR, RhiError> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)?
        };
        Ok(capabilities)
    }

    /// Query capabilities, formats and present modes for one adapter.
    pub fn query_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<SurfaceProperties, RhiError> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)?
        };
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)?
        };
        let present_modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)?
        };

        Ok(SurfaceProperties {
            capabilities,
            formats,
            present_modes,
        })
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
