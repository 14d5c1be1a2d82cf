//! Texture samplers.

use ash::vk;

use crate::device::RenderDevice;
use crate::error::RhiError;

/// Sampler configuration.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            min_lod: 0.0,
            max_lod: vk::LOD_CLAMP_NONE,
        }
    }
}

impl SamplerConfig {
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn nearest() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            ..Default::default()
        }
    }

    pub fn with_address_mode(mut self, mode: vk::SamplerAddressMode) -> Self {
        self.address_mode = mode;
        self
    }
}

pub struct Sampler {
    device: ash::Device,
    name: String,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn new(name: &str, device: &RenderDevice, config: &SamplerConfig) -> Result<Self, RhiError> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(config.mag_filter)
            .min_filter(config.min_filter)
            .mipmap_mode(config.mipmap_mode)
            .address_mode_u(config.address_mode)
            .address_mode_v(config.address_mode)
            .address_mode_w(config.address_mode)
            .min_lod(config.min_lod)
            .max_lod(config.max_lod);

        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        device.set_object_name(sampler, name);

        Ok(Self {
            device: device.handle().clone(),
            name: name.to_owned(),
            sampler,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}
