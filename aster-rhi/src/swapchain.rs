//! Swapchain creation, presentation, and resize.
//!
//! The swapchain owns its images and their wrapper textures. Per-frame
//! synchronization lives in [`crate::frame::FramePool`]; the swapchain only
//! consumes the semaphores handed to `acquire` and `present`.

use ash::vk;

use crate::core::RhiCore;
use crate::device::{PhysicalDevice, Queue, QueueFamilies, RenderDevice};
use crate::error::{map_surface_error, RhiError};
use crate::surface::WindowSurface;
use crate::texture::Texture;

/// Preferred swapchain parameters. Preferences degrade gracefully when the
/// surface does not offer them.
pub struct SwapchainConfig {
    pub preferred_format: vk::Format,
    pub preferred_color_space: vk::ColorSpaceKHR,
    pub preferred_present_mode: vk::PresentModeKHR,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            preferred_format: vk::Format::B8G8R8A8_SRGB,
            preferred_color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

/// Result of a successful image acquire.
#[derive(Debug, Clone, Copy)]
pub struct AcquiredImage {
    pub index: u32,
    /// The image is usable but the swapchain no longer matches the surface
    /// exactly; render this frame, then recreate.
    pub suboptimal: bool,
}

/// Outcome of a present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentState {
    Optimal,
    /// Presented (or dropped) against a stale swapchain; recreate before the
    /// next frame.
    Stale,
}

pub struct Swapchain {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_families: QueueFamilies,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,

    textures: Vec<Texture>,
    extent: vk::Extent2D,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    #[profiling::function]
    pub fn new(
        core: &RhiCore,
        device: &RenderDevice,
        physical_device: &PhysicalDevice,
        surface: &WindowSurface,
        config: SwapchainConfig,
    ) -> Result<Self, RhiError> {
        let properties = surface.query_properties(physical_device.handle())?;
        if !properties.is_renderable() {
            return Err(RhiError::NoSurfaceFormats);
        }

        let format = choose_surface_format(&properties.formats, &config);
        let present_mode = choose_present_mode(&properties.present_modes, &config);
        let extent = surface_extent(&properties.capabilities, surface.framebuffer_extent()?);

        let queue_families = physical_device.queue_families();
        let swapchain_loader = ash::khr::swapchain::Device::new(core.instance(), device.handle());
        let swapchain = create_swapchain(
            &swapchain_loader,
            surface.handle(),
            &properties.capabilities,
            format,
            present_mode,
            extent,
            queue_families,
            vk::SwapchainKHR::null(),
        )?;
        device.set_object_name(swapchain, "swapchain.main");

        let textures =
            create_backbuffers(device, &swapchain_loader, swapchain, format.format, extent)?;

        Ok(Self {
            device: device.handle().clone(),
            physical_device: physical_device.handle(),
            queue_families,
            swapchain_loader,
            swapchain,
            textures,
            extent,
            format,
            present_mode,
        })
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Acquire the next image, signaling the given semaphore when it is
    /// ready. A stale swapchain surfaces as [`RhiError::SwapchainOutOfDate`].
    #[profiling::function]
    pub fn acquire(&mut self, signal_semaphore: vk::Semaphore) -> Result<AcquiredImage, RhiError> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal_semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquiredImage { index, suboptimal }),
            Err(e) => Err(map_surface_error(e)),
        }
    }

    /// Present the given image once the wait semaphore signals.
    ///
    /// An out-of-date swapchain is reported as [`PresentState::Stale`], not
    /// an error: the present call has already consumed the semaphore wait,
    /// so the caller just recreates and carries on.
    #[profiling::function]
    pub fn present(
        &mut self,
        surface: &WindowSurface,
        present_queue: Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentState, RhiError> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        surface.window()?.pre_present_notify();
        let result = unsafe {
            self.swapchain_loader
                .queue_present(present_queue.handle(), &present_info)
        };

        match result {
            Ok(false) => Ok(PresentState::Optimal),
            Ok(true) => Ok(PresentState::Stale),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentState::Stale),
            Err(e) => Err(RhiError::Vulkan(e)),
        }
    }

    /// Recreate the swapchain for a new framebuffer size. Zero-sized
    /// requests (minimized window) are ignored.
    #[profiling::function]
    pub fn resize(
        &mut self,
        device: &RenderDevice,
        surface: &WindowSurface,
        extent: vk::Extent2D,
    ) -> Result<(), RhiError> {
        if extent.width == 0 || extent.height == 0 {
            log::debug!("Ignoring zero-extent swapchain resize");
            return Ok(());
        }

        device.wait_until_idle()?;

        // Surface capabilities change with the window, so re-query
        let capabilities = surface.capabilities(self.physical_device)?;
        let extent = surface_extent(&capabilities, extent);

        // Views into the old images must go before the old swapchain does
        self.textures.clear();

        self.swapchain = create_swapchain(
            &self.swapchain_loader,
            surface.handle(),
            &capabilities,
            self.format,
            self.present_mode,
            extent,
            self.queue_families,
            self.swapchain,
        )?;
        self.extent = extent;
        self.textures = create_backbuffers(
            device,
            &self.swapchain_loader,
            self.swapchain,
            self.format.format,
            extent,
        )?;

        Ok(())
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn image_count(&self) -> u32 {
        self.textures.len() as u32
    }

    pub fn texture(&self, image_index: u32) -> &Texture {
        &self.textures[image_index as usize]
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::warn!("device_wait_idle failed during swapchain teardown: {e}");
            }
        }

        self.textures.clear();
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Create a swapchain, destroying `old_swapchain` once the new one exists.
#[profiling::function]
fn create_swapchain(
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    capabilities: &vk::SurfaceCapabilitiesKHR,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    queue_families: QueueFamilies,
    old_swapchain: vk::SwapchainKHR,
) -> Result<vk::SwapchainKHR, RhiError> {
    let image_count = choose_image_count(capabilities);

    log::info!(
        "Creating swapchain: {:?} {:?}, {}x{}, {} images, {:?}",
        format.format,
        format.color_space,
        extent.width,
        extent.height,
        image_count,
        present_mode
    );

    let family_indices = [queue_families.graphics, queue_families.present];
    let mut create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    if !queue_families.is_unified() {
        create_info = create_info
            .image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(&family_indices);
    }

    let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

    if old_swapchain != vk::SwapchainKHR::null() {
        unsafe {
            swapchain_loader.destroy_swapchain(old_swapchain, None);
        }
    }

    Ok(swapchain)
}

fn create_backbuffers(
    device: &RenderDevice,
    swapchain_loader: &ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    format: vk::Format,
    extent: vk::Extent2D,
) -> Result<Vec<Texture>, RhiError> {
    let images = unsafe { swapchain_loader.get_swapchain_images(swapchain)? };

    Ok(images
        .into_iter()
        .enumerate()
        .map(|(idx, image)| {
            Texture::from_swapchain_image(
                device,
                format!("swapchain.backbuffer{idx}"),
                image,
                format,
                extent,
            )
        })
        .collect())
}

/// One more image than the driver's minimum, so acquire rarely blocks on the
/// presentation engine. Capped when the driver caps.
fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count = image_count.min(capabilities.max_image_count);
    }
    image_count
}

fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    config: &SwapchainConfig,
) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|f| {
            f.format == config.preferred_format && f.color_space == config.preferred_color_space
        })
        .copied()
        .unwrap_or(formats[0])
}

fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    config: &SwapchainConfig,
) -> vk::PresentModeKHR {
    // Prefer the requested mode, fall back to mailbox, then FIFO, which is
    // always available
    if modes.contains(&config.preferred_present_mode) {
        config.preferred_present_mode
    } else if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Drivers report `u32::MAX` as the current extent when the window manager
/// lets the swapchain pick; in that case clamp the framebuffer size to the
/// supported range.
fn surface_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
