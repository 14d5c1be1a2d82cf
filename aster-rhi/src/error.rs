//! Error taxonomy for the RHI boundary.

use ash::vk;
use thiserror::Error;

/// Errors surfaced by RHI operations.
///
/// Initialization variants are fatal for the process: the caller reports them
/// and exits. [`RhiError::SwapchainOutOfDate`] is the one transient case and
/// must be answered by recreating the swapchain, never by aborting.
#[derive(Debug, Error)]
pub enum RhiError {
    #[error("failed to load the Vulkan library: {0}")]
    LibraryLoad(#[from] ash::LoadingError),

    #[error("window handle is unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("no Vulkan-capable adapter satisfies the surface and queue requirements")]
    NoSuitableAdapter,

    #[error("surface reports no formats or present modes")]
    NoSurfaceFormats,

    #[error("window was destroyed while the surface was still in use")]
    WindowLost,

    #[error("swapchain no longer matches the surface and must be recreated")]
    SwapchainOutOfDate,

    #[error("GPU memory allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("write to buffer '{name}' ends at byte {end} but the buffer holds {size}")]
    BufferWriteOutOfBounds { name: String, end: u64, size: u64 },

    #[error("buffer '{0}' has no host-visible mapping")]
    NotHostVisible(String),

    #[error("failed to read shader file '{}'", path.display())]
    ShaderLoad {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader '{name}' is not valid SPIR-V")]
    InvalidSpirv {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}

impl RhiError {
    /// Whether this error is handled by the resize path instead of failing the
    /// frame.
    #[inline]
    pub fn is_stale_swapchain(&self) -> bool {
        matches!(self, RhiError::SwapchainOutOfDate)
    }
}

/// Fold an acquire/present result code into the taxonomy: out-of-date becomes
/// the transient variant, everything else stays a raw Vulkan error.
pub(crate) fn map_surface_error(err: vk::Result) -> RhiError {
    match err {
        vk::Result::ERROR_OUT_OF_DATE_KHR => RhiError::SwapchainOutOfDate,
        other => RhiError::Vulkan(other),
    }
}
