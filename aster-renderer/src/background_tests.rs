use super::*;
use std::mem::{offset_of, size_of};

#[test]
fn dispatch_covers_every_pixel_without_a_spare_column() {
    assert_eq!(dispatch_group_count(GROUP_SIZE), 1);
    assert_eq!(dispatch_group_count(GROUP_SIZE + 1), 2);
    assert_eq!(dispatch_group_count(1920), 120);
    // odd height still rounds up
    assert_eq!(dispatch_group_count(1081), 68);
}

#[test]
fn dispatch_of_a_zero_extent_is_zero_groups() {
    assert_eq!(dispatch_group_count(0), 0);
}

#[test]
fn gradient_params_layout_matches_the_shader_push_block() {
    assert_eq!(size_of::<GradientParams>(), 32);
    assert_eq!(offset_of!(GradientParams, top), 0);
    assert_eq!(offset_of!(GradientParams, bottom), 16);
}

#[test]
fn default_gradient_is_opaque() {
    let params = GradientParams::default();
    assert_eq!(params.top.w, 1.0);
    assert_eq!(params.bottom.w, 1.0);
}
