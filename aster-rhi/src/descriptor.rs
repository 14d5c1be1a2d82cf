//! Descriptor layouts, the shared descriptor pool, and batched set updates.

use ash::vk;
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::error::RhiError;

/// One binding in a descriptor set layout.
#[derive(Debug, Clone)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stage_flags: vk::ShaderStageFlags,
}

impl LayoutBinding {
    pub fn new(
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        Self {
            binding,
            descriptor_type,
            count: 1,
            stage_flags,
        }
    }
}

/// Descriptor set layout with binding metadata kept for lookups.
pub struct DescriptorSetLayout {
    device: ash::Device,
    layout: vk::DescriptorSetLayout,
    bindings: Vec<LayoutBinding>,
    binding_map: HashMap<u32, usize>,
}

impl DescriptorSetLayout {
    pub fn new(device: &ash::Device, bindings: &[LayoutBinding]) -> Result<Self, RhiError> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.count)
                    .stage_flags(b.stage_flags)
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&create_info, None)? };

        let binding_map: HashMap<u32, usize> = bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (b.binding, i))
            .collect();

        Ok(Self {
            device: device.clone(),
            layout,
            bindings: bindings.to_vec(),
            binding_map,
        })
    }

    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get binding information by binding index.
    pub fn get_binding(&self, binding: u32) -> Option<&LayoutBinding> {
        self.binding_map.get(&binding).map(|&i| &self.bindings[i])
    }

    pub fn bindings(&self) -> &[LayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool for allocating descriptor sets.
///
/// Created with `FREE_DESCRIPTOR_SET` so individual sets can be returned,
/// though steady-state rendering allocates once and reuses.
pub struct DescriptorPool {
    device: ash::Device,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    pub fn new(
        device: &ash::Device,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> Result<Self, RhiError> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

        let pool = unsafe { device.create_descriptor_pool(&create_info, None)? };

        Ok(Self {
            device: device.clone(),
            pool,
            max_sets,
        })
    }

    /// Allocate a single descriptor set.
    pub fn allocate(&self, layout: &DescriptorSetLayout) -> Result<vk::DescriptorSet, RhiError> {
        let layouts = [layout.handle()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info)? };
        Ok(sets[0])
    }

    /// Allocate multiple descriptor sets with the same layout.
    pub fn allocate_many(
        &self,
        layout: &DescriptorSetLayout,
        count: u32,
    ) -> Result<Vec<vk::DescriptorSet>, RhiError> {
        let layouts: Vec<vk::DescriptorSetLayout> = (0..count).map(|_| layout.handle()).collect();
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info)? };
        Ok(sets)
    }

    /// Free a descriptor set back to the pool.
    pub fn free(&self, set: vk::DescriptorSet) -> Result<(), RhiError> {
        unsafe { self.device.free_descriptor_sets(self.pool, &[set])? };
        Ok(())
    }

    /// Reset the pool, freeing all allocated descriptor sets.
    pub fn reset(&self) -> Result<(), RhiError> {
        unsafe {
            self.device
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())?;
        }
        Ok(())
    }

    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingResource {
    Buffer(usize),
    Image(usize),
}

struct PendingWrite {
    binding: u32,
    descriptor_type: vk::DescriptorType,
    resource: PendingResource,
}

/// Collects descriptor writes for one set and flushes them in a single
/// `vkUpdateDescriptorSets` call.
#[derive(Default)]
pub struct DescriptorWriter {
    buffer_infos: Vec<vk::DescriptorBufferInfo>,
    image_infos: Vec<vk::DescriptorImageInfo>,
    pending: Vec<PendingWrite>,
}

impl DescriptorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a buffer write for the given binding.
    pub fn write_buffer(
        &mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> &mut Self {
        self.buffer_infos.push(
            vk::DescriptorBufferInfo::default()
                .buffer(buffer)
                .offset(offset)
                .range(range),
        );
        self.pending.push(PendingWrite {
            binding,
            descriptor_type,
            resource: PendingResource::Buffer(self.buffer_infos.len() - 1),
        });
        self
    }

    /// Queue an image write for the given binding. Pass a null sampler for
    /// storage and sampled images.
    pub fn write_image(
        &mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> &mut Self {
        self.image_infos.push(
            vk::DescriptorImageInfo::default()
                .image_view(view)
                .sampler(sampler)
                .image_layout(layout),
        );
        self.pending.push(PendingWrite {
            binding,
            descriptor_type,
            resource: PendingResource::Image(self.image_infos.len() - 1),
        });
        self
    }

    /// Flush all queued writes into the given set.
    pub fn update(&self, device: &ash::Device, set: vk::DescriptorSet) {
        let writes = self
            .pending
            .iter()
            .map(|pending| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(pending.binding)
                    .dst_array_element(0)
                    .descriptor_type(pending.descriptor_type);

                match pending.resource {
                    PendingResource::Buffer(index) => {
                        write.buffer_info(std::slice::from_ref(&self.buffer_infos[index]))
                    }
                    PendingResource::Image(index) => {
                        write.image_info(std::slice::from_ref(&self.image_infos[index]))
                    }
                }
            })
            .collect::<SmallVec<[vk::WriteDescriptorSet; 8]>>();

        if !writes.is_empty() {
            unsafe {
                device.update_descriptor_sets(&writes, &[]);
            }
        }
    }
}
