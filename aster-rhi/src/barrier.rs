//! Coarse pipeline barriers.
//!
//! Every transition uses ALL_COMMANDS stage masks with memory read/write
//! access on both sides; the image layout is the only precise part. The
//! frame has a handful of passes, so transitions are not worth per-stage
//! masks here.

use ash::vk;

/// Logical state of a texture, mapped one-to-one onto an image layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureState {
    Undefined,
    /// Storage image access from compute.
    General,
    Color,
    DepthStencil,
    Sampled,
    TransferSrc,
    TransferDst,
    Present,
}

impl TextureState {
    pub fn image_layout(self) -> vk::ImageLayout {
        match self {
            TextureState::Undefined => vk::ImageLayout::UNDEFINED,
            TextureState::General => vk::ImageLayout::GENERAL,
            TextureState::Color => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            TextureState::DepthStencil => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            TextureState::Sampled => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            TextureState::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            TextureState::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            TextureState::Present => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }
}

/// Subresource range covering every mip and layer of an image.
pub fn subresource_range_all(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: vk::REMAINING_MIP_LEVELS,
        base_array_layer: 0,
        layer_count: vk::REMAINING_ARRAY_LAYERS,
    }
}

/// Layout transition for a whole image.
pub fn image_barrier<'a>(
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    from: TextureState,
    to: TextureState,
) -> vk::ImageMemoryBarrier2<'a> {
    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .old_layout(from.image_layout())
        .new_layout(to.image_layout())
        .image(image)
        .subresource_range(subresource_range_all(aspect_mask))
}

/// Make prior writes to a buffer range visible to subsequent access.
pub fn buffer_barrier<'a>(
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
) -> vk::BufferMemoryBarrier2<'a> {
    vk::BufferMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .buffer(buffer)
        .offset(offset)
        .size(size)
}

/// Flush all memory writes so they are visible to subsequent GPU operations.
pub fn flush_all_memory_writes<'a>() -> vk::MemoryBarrier2<'a> {
    vk::MemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE)
}
