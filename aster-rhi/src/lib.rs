//! Aster RHI (Render Hardware Interface) - Pure Vulkan backend.
//!
//! This crate wraps Vulkan 1.3 in owned handle types with explicit
//! lifetimes. There are no globals: callers hold a [`RenderContext`] and
//! pass borrows of its parts to whatever needs them.

pub mod barrier;
pub mod buffer;
pub mod command;
pub mod context;
pub mod core;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod frame;
pub mod memory;
pub mod pipeline;
pub mod sampler;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod texture;

pub use ash::vk;
pub use gpu_allocator::MemoryLocation;

pub use barrier::TextureState;
pub use buffer::{Buffer, BufferDesc};
pub use command::{CommandEncoder, CommandPool};
pub use context::RenderContext;
pub use core::RhiCore;
pub use descriptor::{DescriptorPool, DescriptorSetLayout, DescriptorWriter, LayoutBinding};
pub use device::{select_physical_device, PhysicalDevice, Queue, QueueFamilies, RenderDevice};
pub use error::RhiError;
pub use frame::{
    Fence, Frame, FramePool, ImmediateContext, Semaphore, FRAMES_IN_FLIGHT,
};
pub use memory::GpuMemory;
pub use pipeline::{
    draw_push_constant_range, standard_mesh_bindings, BlendMode, GraphicsPipelineDesc, Pipeline,
    PipelineKind, DRAW_PUSH_CONSTANT_SIZE,
};
pub use sampler::{Sampler, SamplerConfig};
pub use shader::{ShaderModule, ShaderStage};
pub use surface::{SurfaceProperties, WindowSurface};
pub use swapchain::{AcquiredImage, PresentState, Swapchain, SwapchainConfig};
pub use texture::{Texture, TextureDesc};
