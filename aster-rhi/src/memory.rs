//! GPU memory allocation and the shared descriptor pool.
//!
//! All buffer and texture memory comes from one [`gpu_allocator`] instance
//! behind a mutex. Resources keep an [`Arc`] to it so they can return their
//! allocation from `Drop` without a back-reference into the context.

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::RhiCore;
use crate::descriptor::DescriptorPool;
use crate::device::{PhysicalDevice, RenderDevice};
use crate::error::RhiError;

/// Default capacity of the shared descriptor pool.
pub const DEFAULT_MAX_SETS: u32 = 1024;

/// Per-type descriptor capacities as fixed multiples of `max_sets`.
///
/// Samplers dominate material sets, so they get twice the headroom; storage
/// images only back compute targets and need far less.
pub fn descriptor_pool_sizes(max_sets: u32) -> [vk::DescriptorPoolSize; 4] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: max_sets * 2,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: max_sets,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: max_sets,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_IMAGE,
            descriptor_count: max_sets / 2,
        },
    ]
}

/// The allocator plus a live-allocation counter, shared between the context
/// and every resource created from it.
pub(crate) struct AllocatorShared {
    allocator: Mutex<Allocator>,
    live_allocations: AtomicUsize,
}

impl AllocatorShared {
    pub(crate) fn allocate(&self, desc: &AllocationCreateDesc) -> Result<Allocation, RhiError> {
        let mut allocator = self.allocator.lock().unwrap_or_else(PoisonError::into_inner);
        let allocation = allocator.allocate(desc)?;
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        Ok(allocation)
    }

    /// Return an allocation. Failures are logged, not propagated, because
    /// this runs from resource `Drop` impls.
    pub(crate) fn free(&self, allocation: Allocation) {
        let mut allocator = self.allocator.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = allocator.free(allocation) {
            log::warn!("Freeing a GPU allocation failed: {e}");
        } else {
            self.live_allocations.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn live_allocations(&self) -> usize {
        self.live_allocations.load(Ordering::Relaxed)
    }
}

/// Owns the device allocator and the shared descriptor pool.
pub struct GpuMemory {
    shared: Arc<AllocatorShared>,
    descriptor_pool: DescriptorPool,
}

impl GpuMemory {
    #[profiling::function]
    pub fn new(
        core: &RhiCore,
        physical_device: &PhysicalDevice,
        device: &RenderDevice,
    ) -> Result<Self, RhiError> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: core.instance().clone(),
            device: device.handle().clone(),
            physical_device: physical_device.handle(),
            debug_settings: Default::default(),
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        })?;

        let descriptor_pool = DescriptorPool::new(
            device.handle(),
            DEFAULT_MAX_SETS,
            &descriptor_pool_sizes(DEFAULT_MAX_SETS),
        )?;

        Ok(Self {
            shared: Arc::new(AllocatorShared {
                allocator: Mutex::new(allocator),
                live_allocations: AtomicUsize::new(0),
            }),
            descriptor_pool,
        })
    }

    pub(crate) fn shared(&self) -> Arc<AllocatorShared> {
        Arc::clone(&self.shared)
    }

    /// Allocate device memory for the given requirements.
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation, RhiError> {
        self.shared.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
    }

    /// Number of allocations currently alive. Useful for leak checks in
    /// teardown paths.
    pub fn live_allocations(&self) -> usize {
        self.shared.live_allocations()
    }

    /// The descriptor pool shared by the whole context.
    pub fn descriptor_pool(&self) -> &DescriptorPool {
        &self.descriptor_pool
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
