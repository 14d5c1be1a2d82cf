//! Offscreen render targets.
//!
//! The scene draws into a floating-point color target plus a depth buffer,
//! both sized to the swapchain. The color target doubles as a storage image
//! for the compute background and as a blit source for presentation.

use aster_rhi::{vk, RenderContext, RhiError, Texture, TextureDesc};

/// Format of the offscreen color target. Sixteen-bit float keeps lighting
/// headroom before the blit to the display format.
pub const DRAW_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

/// Color and depth targets for one frame of scene rendering.
pub struct RenderTargets {
    draw: Texture,
    depth: Texture,
    extent: vk::Extent2D,
}

impl RenderTargets {
    #[profiling::function]
    pub fn new(context: &RenderContext, extent: vk::Extent2D) -> Result<Self, RhiError> {
        let draw_desc = TextureDesc::new_color_attachment(extent.width, extent.height, DRAW_FORMAT)
            .with_name("target.draw")
            .with_additional_usage(
                vk::ImageUsageFlags::STORAGE
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST,
            );
        let draw = Texture::new(context.device(), context.memory(), &draw_desc)?;

        let depth_desc = TextureDesc::new_depth_attachment(extent.width, extent.height)
            .with_name("target.depth");
        let depth = Texture::new(context.device(), context.memory(), &depth_desc)?;

        log::debug!(
            "Created render targets {}x{} ({:?} + {:?})",
            extent.width,
            extent.height,
            draw.format(),
            depth.format()
        );

        Ok(Self { draw, depth, extent })
    }

    pub fn draw(&self) -> &Texture {
        &self.draw
    }

    pub fn depth(&self) -> &Texture {
        &self.depth
    }

    pub fn color_format(&self) -> vk::Format {
        self.draw.format()
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth.format()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}
