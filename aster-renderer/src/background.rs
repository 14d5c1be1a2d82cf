//! Compute-dispatched background.
//!
//! A small compute shader writes a vertical gradient straight into the draw
//! target as a storage image, before any geometry is rasterized. It stands in
//! for a sky pass and keeps the storage-image descriptor path exercised.

use aster_rhi::{
    CommandEncoder, DescriptorSetLayout, DescriptorWriter, LayoutBinding, Pipeline, RenderContext,
    RhiError, ShaderModule, Texture, vk,
};
use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Workgroup edge length of the background shader. Must match the shader's
/// `local_size_x/y`.
pub const GROUP_SIZE: u32 = 16;

/// Push constants of the gradient shader: colors at the top and bottom of
/// the image, interpolated per pixel.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GradientParams {
    pub top: Vec4,
    pub bottom: Vec4,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            top: Vec4::new(0.12, 0.2, 0.38, 1.0),
            bottom: Vec4::new(0.02, 0.02, 0.05, 1.0),
        }
    }
}

/// Number of workgroups needed to cover `size` pixels along one axis.
pub fn dispatch_group_count(size: u32) -> u32 {
    size.div_ceil(GROUP_SIZE)
}

/// The background pass and its storage-image descriptor.
pub struct BackgroundPass {
    set_layout: DescriptorSetLayout,
    set: vk::DescriptorSet,
    pipeline: Pipeline,
    params: GradientParams,
}

impl BackgroundPass {
    pub fn new(context: &RenderContext, shader: &ShaderModule) -> Result<Self, RhiError> {
        let set_layout = DescriptorSetLayout::new(
            context.device().handle(),
            &[LayoutBinding::new(
                0,
                vk::DescriptorType::STORAGE_IMAGE,
                vk::ShaderStageFlags::COMPUTE,
            )],
        )?;
        let set = context.memory().descriptor_pool().allocate(&set_layout)?;

        let push_range = vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::COMPUTE,
            offset: 0,
            size: std::mem::size_of::<GradientParams>() as u32,
        };
        let pipeline = Pipeline::new_compute(
            "pipeline.background",
            context.device(),
            shader,
            &[set_layout.handle()],
            &[push_range],
        )?;

        Ok(Self {
            set_layout,
            set,
            pipeline,
            params: GradientParams::default(),
        })
    }

    /// Point the pass at a draw target. Call again after the target is
    /// recreated on resize.
    pub fn attach(&self, context: &RenderContext, draw: &Texture) -> Result<(), RhiError> {
        DescriptorWriter::new()
            .write_image(
                0,
                vk::DescriptorType::STORAGE_IMAGE,
                draw.view()?,
                vk::Sampler::null(),
                vk::ImageLayout::GENERAL,
            )
            .update(context.device().handle(), self.set);
        Ok(())
    }

    pub fn params(&self) -> GradientParams {
        self.params
    }

    pub fn set_params(&mut self, params: GradientParams) {
        self.params = params;
    }

    /// Record the gradient dispatch. The draw target must be in GENERAL
    /// layout.
    pub fn record(&self, encoder: &CommandEncoder, extent: vk::Extent2D) {
        encoder.bind_pipeline(&self.pipeline);
        encoder.bind_descriptor_sets(&self.pipeline, 0, &[self.set]);
        encoder.push_constants(
            self.pipeline.layout(),
            vk::ShaderStageFlags::COMPUTE,
            0,
            &self.params,
        );
        encoder.dispatch(
            dispatch_group_count(extent.width),
            dispatch_group_count(extent.height),
            1,
        );
    }

    pub fn set_layout(&self) -> &DescriptorSetLayout {
        &self.set_layout
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
