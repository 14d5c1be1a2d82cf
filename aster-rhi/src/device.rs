//! Adapter selection and logical device.
//!
//! Adapters are taken in enumeration order and the first one that satisfies
//! the surface and feature requirements wins. Preferring a discrete GPU over
//! an integrated one is a policy decision left to the machine's driver
//! ordering, not to the RHI.

use ash::{vk, Instance};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::ffi::CStr;

use crate::core::RhiCore;
use crate::error::RhiError;
use crate::surface::WindowSurface;

/// Device extensions every adapter must provide.
const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family indices resolved for one adapter.
///
/// Graphics and present are usually the same family; when they differ the
/// swapchain shares its images between both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn is_unified(&self) -> bool {
        self.graphics == self.present
    }
}

/// A selected adapter with the data the rest of the RHI needs from it.
#[derive(Clone)]
pub struct PhysicalDevice {
    handle: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queue_families: QueueFamilies,
    name: String,
}

impl PhysicalDevice {
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Pick the first adapter that can drive the given surface.
#[profiling::function]
pub fn select_physical_device(
    core: &RhiCore,
    surface: &WindowSurface,
) -> Result<PhysicalDevice, RhiError> {
    let instance = core.instance();
    let candidates = unsafe { instance.enumerate_physical_devices()? };

    for candidate in candidates {
        let properties = unsafe { instance.get_physical_device_properties(candidate) };
        let name = adapter_name(&properties);

        let Some(queue_families) = find_queue_families(instance, candidate, surface)? else {
            log::debug!("Skipping '{name}': no graphics + present queue families");
            continue;
        };

        if !supports_required_extensions(instance, candidate)? {
            log::debug!("Skipping '{name}': missing required device extensions");
            continue;
        }

        if !supports_required_features(instance, candidate) {
            log::debug!("Skipping '{name}': missing required device features");
            continue;
        }

        let surface_properties = surface.query_properties(candidate)?;
        if !surface_properties.is_renderable() {
            log::debug!("Skipping '{name}': surface reports no formats or present modes");
            continue;
        }

        log::info!(
            "Selected adapter '{name}' (graphics family {}, present family {})",
            queue_families.graphics,
            queue_families.present
        );

        return Ok(PhysicalDevice {
            handle: candidate,
            properties,
            queue_families,
            name,
        });
    }

    Err(RhiError::NoSuitableAdapter)
}

fn adapter_name(properties: &vk::PhysicalDeviceProperties) -> String {
    properties
        .device_name_as_c_str()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("Unknown adapter"))
}

/// Resolve graphics and present queue families, taking the first family that
/// provides each capability.
fn find_queue_families(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    surface: &WindowSurface,
) -> Result<Option<QueueFamilies>, RhiError> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let mut graphics = None;
    let mut present = None;

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            graphics = Some(index);
        }

        if present.is_none() && surface.supports_present(physical_device, index)? {
            present = Some(index);
        }

        if let (Some(graphics), Some(present)) = (graphics, present) {
            return Ok(Some(QueueFamilies { graphics, present }));
        }
    }

    Ok(None)
}

fn supports_required_extensions(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<bool, RhiError> {
    let available = unsafe { instance.enumerate_device_extension_properties(physical_device)? };

    let all_present = REQUIRED_DEVICE_EXTENSIONS.iter().all(|&required| {
        available
            .iter()
            .any(|ext| ext.extension_name_as_c_str() == Ok(required))
    });

    Ok(all_present)
}

/// Dynamic rendering and synchronization2 back every render pass and barrier
/// in this crate; buffer device address backs vertex pulling.
fn supports_required_features(instance: &Instance, physical_device: vk::PhysicalDevice) -> bool {
    let mut features12 = vk::PhysicalDeviceVulkan12Features::default();
    let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
    let mut features = vk::PhysicalDeviceFeatures2::default()
        .push_next(&mut features12)
        .push_next(&mut features13);

    unsafe { instance.get_physical_device_features2(physical_device, &mut features) };

    features12.buffer_device_address == vk::TRUE
        && features13.dynamic_rendering == vk::TRUE
        && features13.synchronization2 == vk::TRUE
}

/// A device queue together with the family it was created from.
#[derive(Debug, Clone, Copy)]
pub struct Queue {
    handle: vk::Queue,
    family_index: u32,
}

impl Queue {
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }
}

/// The logical device plus its queues.
///
/// Everything that records or submits work goes through this. Resources keep
/// their own clone of the underlying [`ash::Device`] so they can destroy
/// themselves without a back-reference.
pub struct RenderDevice {
    device: ash::Device,
    graphics_queue: Queue,
    present_queue: Queue,

    #[cfg(feature = "validation")]
    debug_utils: ash::ext::debug_utils::Device,
}

impl RenderDevice {
    #[profiling::function]
    pub fn new(instance: &Instance, physical_device: &PhysicalDevice) -> Result<Self, RhiError> {
        let families = physical_device.queue_families();

        // One queue per distinct family
        let unique_families: HashSet<u32> = [families.graphics, families.present].into();
        let queue_priority = 1.0_f32;
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(std::slice::from_ref(&queue_priority))
            })
            .collect();

        let extension_pointers: Vec<*const i8> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let mut features12 =
            vk::PhysicalDeviceVulkan12Features::default().buffer_device_address(true);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_pointers)
            .push_next(&mut features12)
            .push_next(&mut features13);

        let device =
            unsafe { instance.create_device(physical_device.handle(), &create_info, None)? };

        let graphics_queue = Queue {
            handle: unsafe { device.get_device_queue(families.graphics, 0) },
            family_index: families.graphics,
        };
        let present_queue = Queue {
            handle: unsafe { device.get_device_queue(families.present, 0) },
            family_index: families.present,
        };

        #[cfg(feature = "validation")]
        let debug_utils = ash::ext::debug_utils::Device::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            #[cfg(feature = "validation")]
            debug_utils,
        })
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    pub fn graphics_queue(&self) -> Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> Queue {
        self.present_queue
    }

    /// Submit one command buffer to the graphics queue.
    ///
    /// Each wait/signal entry pairs a semaphore with the pipeline stages it
    /// gates. The fence, if any, signals when the whole submission retires.
    #[profiling::function]
    pub fn submit_commands(
        &self,
        command_buffer: vk::CommandBuffer,
        wait_semaphores: &[(vk::Semaphore, vk::PipelineStageFlags2)],
        signal_semaphores: &[(vk::Semaphore, vk::PipelineStageFlags2)],
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        let command_submit_info =
            vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer);

        let wait_semaphore_infos = wait_semaphores
            .iter()
            .map(|&(semaphore, stage)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(semaphore)
                    .stage_mask(stage)
            })
            .collect::<SmallVec<[vk::SemaphoreSubmitInfo; 4]>>();

        let signal_semaphore_infos = signal_semaphores
            .iter()
            .map(|&(semaphore, stage)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(semaphore)
                    .stage_mask(stage)
            })
            .collect::<SmallVec<[vk::SemaphoreSubmitInfo; 4]>>();

        let submit_info = vk::SubmitInfo2::default()
            .command_buffer_infos(std::slice::from_ref(&command_submit_info))
            .wait_semaphore_infos(&wait_semaphore_infos)
            .signal_semaphore_infos(&signal_semaphore_infos);

        unsafe {
            self.device
                .queue_submit2(self.graphics_queue.handle(), &[submit_info], fence)?;
        }

        Ok(())
    }

    /// Block until the device is idle. Used before teardown and swapchain
    /// recreation.
    pub fn wait_until_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Attach a human-readable name to a Vulkan object for validation
    /// messages and captures. No-op without the validation feature.
    #[cfg(feature = "validation")]
    pub fn set_object_name<T: vk::Handle>(&self, object: T, name: &str) {
        let Ok(name) = std::ffi::CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(object)
            .object_name(&name);
        // Naming is a debug aid; ignore failures
        unsafe {
            let _ = self.debug_utils.set_debug_utils_object_name(&info);
        }
    }

    #[cfg(not(feature = "validation"))]
    pub fn set_object_name<T: vk::Handle>(&self, _object: T, _name: &str) {}
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        unsafe {
            // Outstanding GPU work must retire before the device goes away
            if let Err(e) = self.device.device_wait_idle() {
                log::warn!("device_wait_idle failed during teardown: {e}");
            }
            self.device.destroy_device(None);
        }
    }
}
