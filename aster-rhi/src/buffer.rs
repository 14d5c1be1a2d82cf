//! GPU buffers.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::device::RenderDevice;
use crate::error::RhiError;
use crate::memory::{AllocatorShared, GpuMemory};

/// Buffer descriptor.
#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub name: String,
    /// Size of the buffer in bytes.
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub location: MemoryLocation,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            name: "Unnamed buffer".to_string(),
            size: 0,
            usage: vk::BufferUsageFlags::empty(),
            location: MemoryLocation::GpuOnly,
        }
    }
}

impl BufferDesc {
    pub fn new(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            ..Default::default()
        }
    }

    /// Vertex data, pulled from the vertex shader through its device
    /// address rather than bound as a vertex input.
    pub fn vertex(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER
                | vk::BufferUsageFlags::TRANSFER_DST
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            location: MemoryLocation::GpuOnly,
        }
    }

    pub fn index(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            usage: vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            location: MemoryLocation::GpuOnly,
        }
    }

    /// Uniform data rewritten by the CPU every frame.
    pub fn uniform(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            location: MemoryLocation::CpuToGpu,
        }
    }

    pub fn storage(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
            location: MemoryLocation::GpuOnly,
        }
    }

    /// Staging source for uploads to device-local memory.
    pub fn staging(name: &str, size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_owned(),
            size,
            usage: vk::BufferUsageFlags::TRANSFER_SRC,
            location: MemoryLocation::CpuToGpu,
        }
    }

    pub fn with_usage(mut self, usage: vk::BufferUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_additional_usage(mut self, usage: vk::BufferUsageFlags) -> Self {
        self.usage |= usage;
        self
    }

    pub fn with_location(mut self, location: MemoryLocation) -> Self {
        self.location = location;
        self
    }

    /// Enable taking the buffer's GPU address.
    pub fn with_device_address(mut self) -> Self {
        self.usage |= vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        self
    }
}

/// A GPU buffer and its backing allocation. Frees both on drop.
pub struct Buffer {
    device: ash::Device,
    allocator: Arc<AllocatorShared>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    desc: BufferDesc,
}

impl Buffer {
    pub fn new(
        device: &RenderDevice,
        memory: &GpuMemory,
        desc: &BufferDesc,
    ) -> Result<Self, RhiError> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = match memory.allocate(&desc.name, requirements, desc.location, true) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        device.set_object_name(buffer, &desc.name);
        log::trace!("Buffer '{}' created ({} bytes)", desc.name, desc.size);

        Ok(Self {
            device: device.handle().clone(),
            allocator: memory.shared(),
            buffer,
            allocation: Some(allocation),
            desc: desc.clone(),
        })
    }

    /// Copy bytes into the buffer through its persistent mapping.
    ///
    /// Only valid for host-visible locations; device-local buffers go
    /// through a staging copy instead.
    pub fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<(), RhiError> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as u64;
        if end > self.desc.size {
            return Err(RhiError::BufferWriteOutOfBounds {
                name: self.desc.name.clone(),
                end,
                size: self.desc.size,
            });
        }

        let mapped = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| RhiError::NotHostVisible(self.desc.name.clone()))?;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.as_ptr().cast::<u8>().add(offset as usize),
                data.len(),
            );
        }

        Ok(())
    }

    /// GPU virtual address of the buffer (requires the device-address usage
    /// flag).
    pub fn device_address(&self) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfo::default().buffer(self.buffer);
        unsafe { self.device.get_buffer_device_address(&info) }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    #[inline]
    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.desc.size
    }

    #[inline]
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.desc.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.allocator.free(allocation);
        }
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
        }
        log::trace!("Buffer '{}' destroyed", self.desc.name);
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
