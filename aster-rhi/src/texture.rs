//! GPU textures.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::device::RenderDevice;
use crate::error::RhiError;
use crate::memory::{AllocatorShared, GpuMemory};

/// Texture descriptor.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub name: String,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub usage: vk::ImageUsageFlags,
    pub image_type: vk::ImageType,
    pub view_type: vk::ImageViewType,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            usage: vk::ImageUsageFlags::SAMPLED,
            image_type: vk::ImageType::TYPE_2D,
            view_type: vk::ImageViewType::TYPE_2D,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
        }
    }
}

impl TextureDesc {
    pub fn new_2d(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            format,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            ..Default::default()
        }
    }

    pub fn new_color_attachment(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            format,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            ..Default::default()
        }
    }

    pub fn new_depth_attachment(width: u32, height: u32) -> Self {
        Self {
            format: vk::Format::D32_SFLOAT,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_additional_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage |= usage;
        self
    }

    pub fn with_mip_levels(mut self, levels: u32) -> Self {
        self.mip_levels = levels;
        self
    }

    pub fn with_transfer_src_usage(mut self) -> Self {
        self.usage |= vk::ImageUsageFlags::TRANSFER_SRC;
        self
    }

    pub fn with_transfer_dst_usage(mut self) -> Self {
        self.usage |= vk::ImageUsageFlags::TRANSFER_DST;
        self
    }
}

#[derive(Hash, PartialEq, Eq, Clone, Copy)]
struct TextureSubresource {
    base_mip: u32,
    num_mips: u32,
    base_layer: u32,
    num_layers: u32,
}

impl TextureSubresource {
    fn to_vk(self, aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: self.base_mip,
            level_count: self.num_mips,
            base_array_layer: self.base_layer,
            layer_count: self.num_layers,
        }
    }
}

/// A GPU image plus lazily created, cached views.
///
/// Swapchain wrappers do not own their image; everything else frees its
/// image and allocation on drop.
pub struct Texture {
    device: ash::Device,
    allocator: Option<Arc<AllocatorShared>>,
    image: vk::Image,
    allocation: Option<Allocation>,
    desc: TextureDesc,
    views: RefCell<HashMap<TextureSubresource, vk::ImageView>>,
}

impl Texture {
    pub fn new(
        device: &RenderDevice,
        memory: &GpuMemory,
        desc: &TextureDesc,
    ) -> Result<Self, RhiError> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(desc.image_type)
            .format(desc.format)
            .extent(desc.extent)
            .mip_levels(desc.mip_levels)
            .array_layers(desc.array_layers)
            .samples(desc.samples)
            .tiling(desc.tiling)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        // Optimal-tiling images are never linear for the allocator
        let allocation =
            match memory.allocate(&desc.name, requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    unsafe { device.handle().destroy_image(image, None) };
                    return Err(e);
                }
            };

        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        device.set_object_name(image, &desc.name);

        Ok(Self {
            device: device.handle().clone(),
            allocator: Some(memory.shared()),
            image,
            allocation: Some(allocation),
            desc: desc.clone(),
            views: RefCell::new(HashMap::new()),
        })
    }

    /// Wrap a swapchain image. The swapchain owns the image; this texture
    /// only owns the views it creates for it.
    pub(crate) fn from_swapchain_image(
        device: &RenderDevice,
        name: String,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Self {
        device.set_object_name(image, &name);

        let desc = TextureDesc {
            name,
            format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            ..Default::default()
        };

        Self {
            device: device.handle().clone(),
            allocator: None,
            image,
            allocation: None,
            desc,
            views: RefCell::new(HashMap::new()),
        }
    }

    /// View covering the whole image. Created on first use and cached.
    pub fn view(&self) -> Result<vk::ImageView, RhiError> {
        self.subresource_view(0, self.desc.mip_levels, 0, self.desc.array_layers)
    }

    /// View of a mip/layer range. Created on first use and cached.
    pub fn subresource_view(
        &self,
        base_mip: u32,
        num_mips: u32,
        base_layer: u32,
        num_layers: u32,
    ) -> Result<vk::ImageView, RhiError> {
        let subresource = TextureSubresource {
            base_mip,
            num_mips,
            base_layer,
            num_layers,
        };

        if let Some(view) = self.views.borrow().get(&subresource).copied() {
            return Ok(view);
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(self.desc.view_type)
            .format(self.desc.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(subresource.to_vk(self.aspect_mask()));

        let view = unsafe { self.device.create_image_view(&view_info, None)? };
        self.views.borrow_mut().insert(subresource, view);
        Ok(view)
    }

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.desc.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent3D {
        self.desc.extent
    }

    #[inline]
    pub fn extent_2d(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.desc.extent.width,
            height: self.desc.extent.height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.extent.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.extent.height
    }

    #[inline]
    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.desc.usage
    }

    /// Aspect flags derived from the format.
    #[inline]
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        format_to_aspect_mask(self.desc.format)
    }

    pub fn is_swapchain_texture(&self) -> bool {
        self.allocator.is_none()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            for view in self.views.borrow().values() {
                self.device.destroy_image_view(*view, None);
            }
        }

        if let Some(allocation) = self.allocation.take() {
            if let Some(allocator) = &self.allocator {
                allocator.free(allocation);
            }
            unsafe {
                self.device.destroy_image(self.image, None);
            }
        }
    }
}

/// Aspect mask appropriate for an image format.
fn format_to_aspect_mask(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}
