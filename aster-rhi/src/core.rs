//! Vulkan core - library loading, instance creation, validation plumbing.

use ash::{vk, Entry, Instance};
use raw_window_handle::{HasDisplayHandle, RawDisplayHandle};
#[cfg(feature = "validation")]
use std::ffi::CStr;
use winit::window::Window;

use crate::device::{PhysicalDevice, RenderDevice};
use crate::error::RhiError;

/// Validation layers to enable with the `validation` feature.
#[cfg(feature = "validation")]
const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

/// This is the global entry point for Vulkan initialization.
///
/// Owns the loaded library and the instance; everything else in the RHI is
/// created from it through [`crate::context::RenderContext`].
pub struct RhiCore {
    entry: Entry,
    instance: Instance,

    /// Debug messenger (only with the validation feature).
    #[cfg(feature = "validation")]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    #[cfg(feature = "validation")]
    debug_utils: Option<ash::ext::debug_utils::Instance>,
}

impl RhiCore {
    /// Load Vulkan and create the instance for the given window's platform.
    #[profiling::function]
    pub fn new(window: &Window) -> Result<Self, RhiError> {
        // Load Vulkan dynamically
        let entry = unsafe { Entry::load()? };

        // Display handle selects the platform surface extension
        let display_handle = window.display_handle()?.as_raw();

        let instance = create_instance(&entry, display_handle)?;

        // The messenger is allowed to fail; rendering works without it
        #[cfg(feature = "validation")]
        let (debug_utils, debug_messenger) = setup_debug_messenger(&entry, &instance);

        Ok(Self {
            entry,
            instance,
            #[cfg(feature = "validation")]
            debug_messenger,
            #[cfg(feature = "validation")]
            debug_utils,
        })
    }

    /// Create a logical device on the selected adapter.
    pub fn create_render_device(&self, physical_device: &PhysicalDevice) -> Result<RenderDevice, RhiError> {
        RenderDevice::new(&self.instance, physical_device)
    }

    /// Get the entry point.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Get a reference to the Vulkan instance.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl Drop for RhiCore {
    fn drop(&mut self) {
        unsafe {
            #[cfg(feature = "validation")]
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Get required instance extensions based on platform.
fn get_required_instance_extensions(display_handle: RawDisplayHandle) -> Vec<*const i8> {
    let mut extensions = vec![
        // Surface extension (always needed)
        ash::khr::surface::NAME.as_ptr(),
    ];

    // Platform-specific surface extension
    #[cfg(target_os = "windows")]
    {
        let _ = display_handle; // Suppress unused warning
        extensions.push(ash::khr::win32_surface::NAME.as_ptr());
    }

    #[cfg(target_os = "linux")]
    {
        match display_handle {
            RawDisplayHandle::Xlib(_) => {
                extensions.push(ash::khr::xlib_surface::NAME.as_ptr());
            }
            RawDisplayHandle::Xcb(_) => {
                extensions.push(ash::khr::xcb_surface::NAME.as_ptr());
            }
            RawDisplayHandle::Wayland(_) => {
                extensions.push(ash::khr::wayland_surface::NAME.as_ptr());
            }
            _ => {}
        }
    }

    // Debug utils (for validation layers)
    #[cfg(feature = "validation")]
    extensions.push(ash::ext::debug_utils::NAME.as_ptr());

    extensions
}

/// Create the instance with required extensions and validation layers.
fn create_instance(entry: &Entry, display_handle: RawDisplayHandle) -> Result<Instance, RhiError> {
    let app_info = vk::ApplicationInfo::default()
        .application_name(c"Aster")
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(c"Aster Engine")
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_3);

    let extensions = get_required_instance_extensions(display_handle);

    #[cfg(feature = "validation")]
    let layer_pointers: Vec<*const i8> = VALIDATION_LAYERS.iter().map(|s| s.as_ptr()).collect();

    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions);

    #[cfg(feature = "validation")]
    {
        create_info = create_info.enabled_layer_names(&layer_pointers);
    }

    let instance = unsafe { entry.create_instance(&create_info, None)? };
    Ok(instance)
}

/// Install the debug messenger. Failure is non-fatal; messages are simply
/// not forwarded.
#[cfg(feature = "validation")]
fn setup_debug_messenger(
    entry: &Entry,
    instance: &Instance,
) -> (Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>) {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    match unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) } {
        Ok(messenger) => (Some(debug_utils), Some(messenger)),
        Err(e) => {
            log::warn!("Debug messenger creation failed ({e}); validation output disabled");
            (None, None)
        }
    }
}

/// Route validation-layer messages into the log facade.
#[cfg(feature = "validation")]
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };
    let message = unsafe { CStr::from_ptr(callback_data.p_message) }.to_string_lossy();

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
        _ => "[Unknown]",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("Vulkan {}: {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("Vulkan {}: {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            log::info!("Vulkan {}: {}", type_str, message);
        }
        _ => {
            log::debug!("Vulkan {}: {}", type_str, message);
        }
    }

    vk::FALSE
}
