use super::*;
use std::mem::{offset_of, size_of};

#[test]
fn scene_data_matches_the_shader_uniform_block() {
    assert_eq!(size_of::<GpuSceneData>(), 192);
    assert_eq!(offset_of!(GpuSceneData, view), 0);
    assert_eq!(offset_of!(GpuSceneData, projection), 64);
    assert_eq!(offset_of!(GpuSceneData, view_projection), 128);
}

#[test]
fn draw_push_constants_fill_the_declared_range() {
    assert_eq!(
        size_of::<DrawPushConstants>() as u32,
        aster_rhi::DRAW_PUSH_CONSTANT_SIZE
    );
    assert_eq!(offset_of!(DrawPushConstants, vertex_buffer), 0);
    assert_eq!(offset_of!(DrawPushConstants, object_index), 8);
}

#[test]
fn object_buffer_fits_exactly_max_objects_transforms() {
    assert_eq!(
        object_buffer_size(),
        (MAX_OBJECTS * size_of::<Mat4>()) as u64
    );
    assert_eq!(size_of::<Mat4>(), 64);
}

#[test]
fn a_clean_acquire_and_present_reports_presented() {
    assert_eq!(
        frame_status(false, PresentState::Optimal),
        RenderStatus::Presented
    );
}

#[test]
fn suboptimal_acquire_still_presents_but_requests_a_resize() {
    assert_eq!(
        frame_status(true, PresentState::Optimal),
        RenderStatus::SwapchainStale
    );
}

#[test]
fn stale_present_requests_a_resize() {
    assert_eq!(
        frame_status(false, PresentState::Stale),
        RenderStatus::SwapchainStale
    );
    assert_eq!(
        frame_status(true, PresentState::Stale),
        RenderStatus::SwapchainStale
    );
}

#[test]
fn missing_shader_files_name_the_offending_path() {
    let err = SceneShaderSources::load_from_dir("/nonexistent/shaders").unwrap_err();
    match err {
        RhiError::ShaderLoad { path, .. } => assert!(path.ends_with("mesh.vert.spv")),
        other => panic!("unexpected error: {other}"),
    }
}
