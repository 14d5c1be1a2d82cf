//! Command buffer pool and recorder.

use ash::vk;
use std::cell::{Cell, RefCell};

use crate::barrier::{self, TextureState};
use crate::device::RenderDevice;
use crate::error::RhiError;
use crate::pipeline::Pipeline;
use crate::texture::Texture;

/// Command buffer pool with pool-level reset.
///
/// Allocated buffers are cached and handed back out in order after each
/// `reset`, so steady-state frames never call into the driver to allocate.
pub struct CommandPool {
    device: ash::Device,
    pool: vk::CommandPool,
    buffers: RefCell<Vec<vk::CommandBuffer>>,
    next_index: Cell<usize>,
}

impl CommandPool {
    pub fn new(
        name: &str,
        device: &RenderDevice,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self, RhiError> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };
        device.set_object_name(pool, name);

        Ok(Self {
            device: device.handle().clone(),
            pool,
            buffers: RefCell::new(Vec::new()),
            next_index: Cell::new(0),
        })
    }

    /// Hand out the next cached command buffer, allocating only when the
    /// cache runs dry.
    pub fn allocate(&self) -> Result<vk::CommandBuffer, RhiError> {
        let index = self.next_index.get();
        self.next_index.set(index + 1);

        if let Some(buffer) = self.buffers.borrow().get(index) {
            return Ok(*buffer);
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info)? };
        let cmd = buffers[0];

        self.buffers.borrow_mut().push(cmd);
        Ok(cmd)
    }

    /// Reset the whole pool. All previously handed-out buffers become
    /// recordable again.
    pub fn reset(&self) -> Result<(), RhiError> {
        self.next_index.set(0);
        unsafe {
            self.device
                .reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty())?;
        }
        Ok(())
    }

    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Command recorder wrapping one command buffer.
pub struct CommandEncoder<'a> {
    device: &'a RenderDevice,
    cmd: vk::CommandBuffer,
}

impl<'a> CommandEncoder<'a> {
    pub fn new(name: &str, device: &'a RenderDevice, pool: &CommandPool) -> Result<Self, RhiError> {
        let cmd = pool.allocate()?;
        device.set_object_name(cmd, name);
        Ok(Self { device, cmd })
    }

    pub fn begin(&self, flags: vk::CommandBufferUsageFlags) -> Result<(), RhiError> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.cmd, &begin_info)?;
        }
        Ok(())
    }

    pub fn end(&self) -> Result<(), RhiError> {
        unsafe { self.device.handle().end_command_buffer(self.cmd)? };
        Ok(())
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.cmd
    }

    // Pipeline commands
    /// Bind a pipeline at the bind point its kind dictates.
    pub fn bind_pipeline(&self, pipeline: &Pipeline) {
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.cmd,
                pipeline.kind().bind_point(),
                pipeline.handle(),
            )
        }
    }

    /// Bind descriptor sets for a pipeline, at the same bind point.
    pub fn bind_descriptor_sets(
        &self,
        pipeline: &Pipeline,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.cmd,
                pipeline.kind().bind_point(),
                pipeline.layout(),
                first_set,
                descriptor_sets,
                &[],
            )
        }
    }

    pub fn bind_index_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_index_buffer(self.cmd, buffer, offset, index_type)
        }
    }

    // Draw and dispatch
    pub fn draw(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            self.device
                .handle()
                .cmd_draw(self.cmd, vertex_count, instance_count, first_vertex, first_instance)
        }
    }

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw_indexed(
                self.cmd,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }

    pub fn dispatch(&self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        unsafe {
            self.device
                .handle()
                .cmd_dispatch(self.cmd, group_count_x, group_count_y, group_count_z)
        }
    }

    // Dynamic state
    pub fn set_viewport(&self, first: u32, viewports: &[vk::Viewport]) {
        unsafe { self.device.handle().cmd_set_viewport(self.cmd, first, viewports) }
    }

    pub fn set_scissor(&self, first: u32, scissors: &[vk::Rect2D]) {
        unsafe { self.device.handle().cmd_set_scissor(self.cmd, first, scissors) }
    }

    // Push constants
    pub fn push_constants<T: Copy>(
        &self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &T,
    ) {
        let bytes = unsafe {
            std::slice::from_raw_parts(data as *const T as *const u8, std::mem::size_of::<T>())
        };
        unsafe {
            self.device
                .handle()
                .cmd_push_constants(self.cmd, layout, stages, offset, bytes)
        }
    }

    // Dynamic rendering (Vulkan 1.3)
    pub fn begin_rendering(&self, info: &vk::RenderingInfo) {
        unsafe { self.device.handle().cmd_begin_rendering(self.cmd, info) }
    }

    pub fn end_rendering(&self) {
        unsafe { self.device.handle().cmd_end_rendering(self.cmd) }
    }

    // Barriers
    /// Transition a whole image between logical states.
    pub fn transition_image(
        &self,
        image: vk::Image,
        aspect_mask: vk::ImageAspectFlags,
        from: TextureState,
        to: TextureState,
    ) {
        let image_barrier = barrier::image_barrier(image, aspect_mask, from, to);
        let dep = vk::DependencyInfo::default()
            .image_memory_barriers(std::slice::from_ref(&image_barrier));
        unsafe { self.device.handle().cmd_pipeline_barrier2(self.cmd, &dep) }
    }

    /// Transition a texture's image between logical states.
    pub fn transition_texture(&self, texture: &Texture, from: TextureState, to: TextureState) {
        self.transition_image(texture.handle(), texture.aspect_mask(), from, to);
    }

    pub fn buffer_barrier(&self, buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) {
        let buffer_barrier = barrier::buffer_barrier(buffer, offset, size);
        let dep = vk::DependencyInfo::default()
            .buffer_memory_barriers(std::slice::from_ref(&buffer_barrier));
        unsafe { self.device.handle().cmd_pipeline_barrier2(self.cmd, &dep) }
    }

    /// Make every prior write visible to every subsequent access.
    pub fn flush_all_writes(&self) {
        let memory_barrier = barrier::flush_all_memory_writes();
        let dep =
            vk::DependencyInfo::default().memory_barriers(std::slice::from_ref(&memory_barrier));
        unsafe { self.device.handle().cmd_pipeline_barrier2(self.cmd, &dep) }
    }

    // Copies
    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe { self.device.handle().cmd_copy_buffer(self.cmd, src, dst, regions) }
    }

    pub fn copy_buffer_to_image(
        &self,
        src: vk::Buffer,
        dst: vk::Image,
        layout: vk::ImageLayout,
        regions: &[vk::BufferImageCopy],
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_copy_buffer_to_image(self.cmd, src, dst, layout, regions)
        }
    }

    pub fn blit_image(
        &self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_blit_image(self.cmd, src, src_layout, dst, dst_layout, regions, filter)
        }
    }

    /// Escape hatch for commands the encoder does not wrap.
    pub fn custom<F>(&self, func: F)
    where
        F: FnOnce(&RenderDevice, vk::CommandBuffer),
    {
        func(self.device, self.cmd);
    }
}
