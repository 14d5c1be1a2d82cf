use super::*;
use std::mem::{offset_of, size_of};

// The vertex shader declares this struct in std430; the offsets here are
// the contract between the two.
#[test]
fn vertex_matches_the_shader_side_layout() {
    assert_eq!(size_of::<Vertex>(), 48);
    assert_eq!(offset_of!(Vertex, position), 0);
    assert_eq!(offset_of!(Vertex, uv_x), 12);
    assert_eq!(offset_of!(Vertex, normal), 16);
    assert_eq!(offset_of!(Vertex, uv_y), 28);
    assert_eq!(offset_of!(Vertex, color), 32);
}

#[test]
fn vertex_constructor_splits_uv_across_the_padding_slots() {
    let vertex = Vertex::new(Vec3::X, Vec3::Z, [0.25, 0.75], Vec4::ONE);
    assert_eq!(vertex.uv_x, 0.25);
    assert_eq!(vertex.uv_y, 0.75);
    assert_eq!(vertex.position, Vec3::X);
    assert_eq!(vertex.normal, Vec3::Z);
}

#[test]
fn vertex_slices_view_as_bytes_without_padding_gaps() {
    let vertices = [
        Vertex::new(Vec3::ZERO, Vec3::Z, [0.0, 0.0], Vec4::ONE),
        Vertex::new(Vec3::X, Vec3::Z, [1.0, 0.0], Vec4::ONE),
    ];
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    assert_eq!(bytes.len(), 2 * size_of::<Vertex>());
}
