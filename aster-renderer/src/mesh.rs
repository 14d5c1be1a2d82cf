//! Geometry and texture upload.
//!
//! Uploads go through a staging buffer and the RHI's immediate context, so
//! they block until the GPU copy finishes. Good enough for load-time assets;
//! streaming would need a proper transfer queue.

use aster_rhi::{
    Buffer, BufferDesc, ImmediateContext, RenderContext, RhiError, Texture, TextureDesc,
    TextureState, vk,
};
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Vertex layout shared by every mesh pipeline.
///
/// UV coordinates sit in the padding after each `Vec3`, which keeps the
/// struct identical under Rust `repr(C)` and GLSL std430. Vertex shaders read
/// this through a buffer device address rather than fixed-function vertex
/// input, so there is no `VertexInputState` to keep in sync.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub uv_x: f32,
    pub normal: Vec3,
    pub uv_y: f32,
    pub color: Vec4,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2], color: Vec4) -> Self {
        Self {
            position,
            uv_x: uv[0],
            normal,
            uv_y: uv[1],
            color,
        }
    }
}

/// Device-local geometry for one mesh.
pub struct MeshBuffers {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    vertex_address: vk::DeviceAddress,
    index_count: u32,
}

impl MeshBuffers {
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    /// GPU address the vertex shader pulls vertices from.
    pub fn vertex_address(&self) -> vk::DeviceAddress {
        self.vertex_address
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Upload vertices and indices into device-local buffers.
///
/// Both copies share one staging buffer, vertices first. Blocks until the
/// GPU finishes.
#[profiling::function]
pub fn upload_mesh(
    context: &RenderContext,
    immediate: &ImmediateContext,
    name: &str,
    vertices: &[Vertex],
    indices: &[u32],
) -> Result<MeshBuffers, RhiError> {
    let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
    let index_bytes: &[u8] = bytemuck::cast_slice(indices);

    let vertex_buffer = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::vertex(&format!("{name}.vertices"), vertex_bytes.len() as u64),
    )?;
    let index_buffer = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::index(&format!("{name}.indices"), index_bytes.len() as u64),
    )?;

    let mut staging = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::staging(
            &format!("{name}.staging"),
            (vertex_bytes.len() + index_bytes.len()) as u64,
        ),
    )?;
    staging.write_bytes(0, vertex_bytes)?;
    staging.write_bytes(vertex_bytes.len() as u64, index_bytes)?;

    immediate.submit_and_wait(context.device(), |encoder| {
        encoder.copy_buffer(
            staging.handle(),
            vertex_buffer.handle(),
            &[vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: vertex_bytes.len() as u64,
            }],
        );
        encoder.copy_buffer(
            staging.handle(),
            index_buffer.handle(),
            &[vk::BufferCopy {
                src_offset: vertex_bytes.len() as u64,
                dst_offset: 0,
                size: index_bytes.len() as u64,
            }],
        );
    })?;

    log::debug!(
        "Uploaded mesh '{name}': {} vertices, {} indices",
        vertices.len(),
        indices.len()
    );

    Ok(MeshBuffers {
        vertex_address: vertex_buffer.device_address(),
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
    })
}

/// Upload tightly packed pixel data into a sampled texture.
///
/// The image ends up in shader-read layout. Blocks until the GPU finishes.
#[profiling::function]
pub fn upload_texture(
    context: &RenderContext,
    immediate: &ImmediateContext,
    name: &str,
    pixels: &[u8],
    width: u32,
    height: u32,
    format: vk::Format,
) -> Result<Texture, RhiError> {
    let desc = TextureDesc::new_2d(width, height, format)
        .with_name(name)
        .with_transfer_dst_usage();
    let texture = Texture::new(context.device(), context.memory(), &desc)?;

    let mut staging = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::staging(&format!("{name}.staging"), pixels.len() as u64),
    )?;
    staging.write_bytes(0, pixels)?;

    immediate.submit_and_wait(context.device(), |encoder| {
        encoder.transition_texture(&texture, TextureState::Undefined, TextureState::TransferDst);

        // row_length 0 means tightly packed
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: texture.extent(),
        };
        encoder.copy_buffer_to_image(
            staging.handle(),
            texture.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        encoder.transition_texture(&texture, TextureState::TransferDst, TextureState::Sampled);
    })?;

    log::debug!("Uploaded texture '{name}' ({width}x{height}, {format:?})");
    Ok(texture)
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
