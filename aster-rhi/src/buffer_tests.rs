use super::*;

#[test]
fn vertex_buffers_are_storage_buffers_with_an_address() {
    let desc = BufferDesc::vertex("mesh.vertices", 1024);

    assert!(desc.usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
    assert!(desc.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert!(desc.usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS));
    // Vertex pulling reads through the address, never the input assembler
    assert!(!desc.usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    assert_eq!(desc.location, MemoryLocation::GpuOnly);
}

#[test]
fn index_buffers_live_on_the_device() {
    let desc = BufferDesc::index("mesh.indices", 512);

    assert!(desc.usage.contains(vk::BufferUsageFlags::INDEX_BUFFER));
    assert!(desc.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert_eq!(desc.location, MemoryLocation::GpuOnly);
}

#[test]
fn uniform_and_staging_buffers_are_host_visible() {
    let uniform = BufferDesc::uniform("frame.uniforms", 256);
    assert!(uniform.usage.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
    assert_eq!(uniform.location, MemoryLocation::CpuToGpu);

    let staging = BufferDesc::staging("upload.staging", 4096);
    assert!(staging.usage.contains(vk::BufferUsageFlags::TRANSFER_SRC));
    assert_eq!(staging.location, MemoryLocation::CpuToGpu);
}

#[test]
fn builders_compose_without_clearing_the_base_usage() {
    let desc = BufferDesc::storage("scene.objects", 2048)
        .with_additional_usage(vk::BufferUsageFlags::TRANSFER_DST)
        .with_device_address();

    assert!(desc.usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
    assert!(desc.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert!(desc.usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS));
    assert_eq!(desc.size, 2048);
    assert_eq!(desc.name, "scene.objects");
}

#[test]
fn location_override_applies() {
    let desc = BufferDesc::storage("readback", 64).with_location(MemoryLocation::GpuToCpu);
    assert_eq!(desc.location, MemoryLocation::GpuToCpu);
}
