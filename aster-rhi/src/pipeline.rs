//! Pipeline layouts and pipelines.
//!
//! Graphics pipelines follow one recipe: no vertex input (vertices are
//! pulled from a storage buffer through its device address), dynamic
//! viewport and scissor, dynamic rendering instead of render passes. The
//! descriptor and push-constant shapes for the standard mesh path live here
//! so every consumer agrees on them.

use ash::vk;

use crate::descriptor::LayoutBinding;
use crate::device::RenderDevice;
use crate::error::RhiError;
use crate::shader::{ShaderModule, ShaderStage};

/// What a pipeline binds as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

impl PipelineKind {
    pub fn bind_point(self) -> vk::PipelineBindPoint {
        match self {
            PipelineKind::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineKind::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
    Disabled,
}

/// Bindings for the standard mesh descriptor set: object transforms in a
/// storage buffer at binding 0, per-frame scene data in a uniform buffer at
/// binding 1.
pub fn standard_mesh_bindings() -> [LayoutBinding; 2] {
    [
        LayoutBinding::new(
            0,
            vk::DescriptorType::STORAGE_BUFFER,
            vk::ShaderStageFlags::VERTEX,
        ),
        LayoutBinding::new(
            1,
            vk::DescriptorType::UNIFORM_BUFFER,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        ),
    ]
}

/// Push-constant footprint of the standard mesh path: a 64-bit vertex
/// buffer address followed by a 32-bit object index, padded to 16 bytes.
pub const DRAW_PUSH_CONSTANT_SIZE: u32 = 16;

pub fn draw_push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange::default()
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .offset(0)
        .size(DRAW_PUSH_CONSTANT_SIZE)
}

/// Graphics pipeline description. The defaults are the standard recipe;
/// builders cover the sanctioned deviations.
pub struct GraphicsPipelineDesc<'a> {
    pub vertex_shader: &'a ShaderModule,
    pub fragment_shader: &'a ShaderModule,
    pub color_format: vk::Format,
    pub depth_format: Option<vk::Format>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub blend: BlendMode,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
}

impl<'a> GraphicsPipelineDesc<'a> {
    pub fn new(
        vertex_shader: &'a ShaderModule,
        fragment_shader: &'a ShaderModule,
        color_format: vk::Format,
    ) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            color_format,
            depth_format: None,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            blend: BlendMode::Alpha,
            depth_write: true,
            depth_compare: vk::CompareOp::LESS,
        }
    }

    /// Enable depth testing against an attachment of the given format.
    pub fn with_depth_format(mut self, format: vk::Format) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_polygon_mode(mut self, polygon_mode: vk::PolygonMode) -> Self {
        self.polygon_mode = polygon_mode;
        self
    }

    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    pub fn with_depth_compare(mut self, op: vk::CompareOp) -> Self {
        self.depth_compare = op;
        self
    }
}

pub struct Pipeline {
    device: ash::Device,
    name: String,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    kind: PipelineKind,
}

impl Pipeline {
    #[profiling::function]
    pub fn new_graphics(
        name: &str,
        device: &RenderDevice,
        desc: &GraphicsPipelineDesc,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self, RhiError> {
        debug_assert_eq!(desc.vertex_shader.stage(), ShaderStage::Vertex);
        debug_assert_eq!(desc.fragment_shader.stage(), ShaderStage::Fragment);

        let layout = create_layout(device, set_layouts, push_constant_ranges)?;

        let entry_point = c"main";
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(desc.vertex_shader.handle())
                .name(entry_point),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(desc.fragment_shader.handle())
                .name(entry_point),
        ];

        // Vertex pulling: no vertex input bindings or attributes
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(desc.topology);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(desc.polygon_mode)
            .cull_mode(desc.cull_mode)
            .front_face(desc.front_face)
            .line_width(1.0);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = if desc.depth_format.is_some() {
            vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(desc.depth_write)
                .depth_compare_op(desc.depth_compare)
        } else {
            vk::PipelineDepthStencilStateCreateInfo::default()
        };

        let blend_attachments = [blend_attachment(desc.blend)];
        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats = [desc.color_format];
        let mut rendering_info =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth_format) = desc.depth_format {
            rendering_info = rendering_info.depth_attachment_format(depth_format);
        }

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { device.handle().destroy_pipeline_layout(layout, None) };
                return Err(RhiError::Vulkan(e));
            }
        };

        device.set_object_name(pipeline, name);
        log::debug!("Created graphics pipeline '{name}'");

        Ok(Self {
            device: device.handle().clone(),
            name: name.to_owned(),
            layout,
            pipeline,
            kind: PipelineKind::Graphics,
        })
    }

    #[profiling::function]
    pub fn new_compute(
        name: &str,
        device: &RenderDevice,
        shader: &ShaderModule,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self, RhiError> {
        debug_assert_eq!(shader.stage(), ShaderStage::Compute);

        let layout = create_layout(device, set_layouts, push_constant_ranges)?;

        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader.handle())
            .name(c"main");

        let pipeline_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipelines = unsafe {
            device
                .handle()
                .create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { device.handle().destroy_pipeline_layout(layout, None) };
                return Err(RhiError::Vulkan(e));
            }
        };

        device.set_object_name(pipeline, name);
        log::debug!("Created compute pipeline '{name}'");

        Ok(Self {
            device: device.handle().clone(),
            name: name.to_owned(),
            layout,
            pipeline,
            kind: PipelineKind::Compute,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    #[inline]
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

fn create_layout(
    device: &RenderDevice,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constant_ranges: &[vk::PushConstantRange],
) -> Result<vk::PipelineLayout, RhiError> {
    let layout_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(set_layouts)
        .push_constant_ranges(push_constant_ranges);
    Ok(unsafe { device.handle().create_pipeline_layout(&layout_info, None)? })
}

fn blend_attachment(mode: BlendMode) -> vk::PipelineColorBlendAttachmentState {
    let attachment = vk::PipelineColorBlendAttachmentState::default().color_write_mask(
        vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A,
    );

    match mode {
        BlendMode::Disabled => attachment,
        BlendMode::Alpha => attachment
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD),
        BlendMode::Additive => attachment
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
