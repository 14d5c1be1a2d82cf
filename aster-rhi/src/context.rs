//! Top-level RHI bring-up.

use std::sync::Arc;
use winit::window::Window;

use crate::core::RhiCore;
use crate::device::{select_physical_device, PhysicalDevice, RenderDevice};
use crate::error::RhiError;
use crate::memory::GpuMemory;
use crate::surface::WindowSurface;

/// Everything needed to talk to one GPU for one window.
///
/// Owns the bring-up chain from instance to allocator. Callers borrow the
/// parts they need; nothing here is global. Field order is the reverse of
/// construction so teardown runs allocator, device, surface, instance.
pub struct RenderContext {
    memory: GpuMemory,
    device: RenderDevice,
    physical_device: PhysicalDevice,
    surface: WindowSurface,
    core: RhiCore,
}

impl RenderContext {
    #[profiling::function]
    pub fn new(window: &Arc<Window>) -> Result<Self, RhiError> {
        let core = RhiCore::new(window)?;
        let surface = WindowSurface::new(&core, window)?;
        let physical_device = select_physical_device(&core, &surface)?;
        let device = core.create_render_device(&physical_device)?;
        let memory = GpuMemory::new(&core, &physical_device, &device)?;

        Ok(Self {
            memory,
            device,
            physical_device,
            surface,
            core,
        })
    }

    #[inline]
    pub fn core(&self) -> &RhiCore {
        &self.core
    }

    #[inline]
    pub fn surface(&self) -> &WindowSurface {
        &self.surface
    }

    #[inline]
    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.physical_device
    }

    #[inline]
    pub fn device(&self) -> &RenderDevice {
        &self.device
    }

    #[inline]
    pub fn memory(&self) -> &GpuMemory {
        &self.memory
    }

    /// Block until the GPU has finished all submitted work.
    pub fn wait_until_idle(&self) -> Result<(), RhiError> {
        self.device.wait_until_idle()
    }
}
