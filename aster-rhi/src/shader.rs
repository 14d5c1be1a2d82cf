//! Shader modules from precompiled SPIR-V.

use ash::vk;
use std::path::Path;

use crate::device::RenderDevice;
use crate::error::RhiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }
}

/// A compiled shader module. Shaders arrive as SPIR-V; compilation from
/// source happens offline.
pub struct ShaderModule {
    device: ash::Device,
    name: String,
    module: vk::ShaderModule,
    stage: ShaderStage,
}

impl ShaderModule {
    pub fn from_spirv(
        name: &str,
        device: &RenderDevice,
        spirv: &[u8],
        stage: ShaderStage,
    ) -> Result<Self, RhiError> {
        // read_spv validates alignment and handles endianness
        let mut cursor = std::io::Cursor::new(spirv);
        let code = ash::util::read_spv(&mut cursor).map_err(|source| RhiError::InvalidSpirv {
            name: name.to_owned(),
            source,
        })?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };
        device.set_object_name(module, name);

        Ok(Self {
            device: device.handle().clone(),
            name: name.to_owned(),
            module,
            stage,
        })
    }

    pub fn from_file(
        name: &str,
        device: &RenderDevice,
        path: impl AsRef<Path>,
        stage: ShaderStage,
    ) -> Result<Self, RhiError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RhiError::ShaderLoad {
            path: path.to_owned(),
            source,
        })?;
        Self::from_spirv(name, device, &bytes, stage)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
