use super::*;

#[test]
fn pipeline_kinds_map_to_their_bind_points() {
    assert_eq!(
        PipelineKind::Graphics.bind_point(),
        vk::PipelineBindPoint::GRAPHICS
    );
    assert_eq!(
        PipelineKind::Compute.bind_point(),
        vk::PipelineBindPoint::COMPUTE
    );
}

#[test]
fn draw_push_constants_fit_an_address_and_an_index() {
    let range = draw_push_constant_range();
    assert_eq!(range.offset, 0);
    assert_eq!(range.size, DRAW_PUSH_CONSTANT_SIZE);
    assert_eq!(range.stage_flags, vk::ShaderStageFlags::VERTEX);

    // 8-byte device address + 4-byte object index, padded to 16
    assert!(range.size as usize >= std::mem::size_of::<vk::DeviceAddress>() + 4);
    assert_eq!(range.size % 8, 0);
}

#[test]
fn mesh_set_puts_transforms_before_scene_data() {
    let bindings = standard_mesh_bindings();

    assert_eq!(bindings[0].binding, 0);
    assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
    assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);

    assert_eq!(bindings[1].binding, 1);
    assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
    assert!(bindings[1]
        .stage_flags
        .contains(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT));
}

#[test]
fn alpha_blending_uses_source_alpha_over() {
    let state = blend_attachment(BlendMode::Alpha);
    assert_eq!(state.blend_enable, vk::TRUE);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(
        state.dst_color_blend_factor,
        vk::BlendFactor::ONE_MINUS_SRC_ALPHA
    );
}

#[test]
fn additive_blending_accumulates_into_the_target() {
    let state = blend_attachment(BlendMode::Additive);
    assert_eq!(state.blend_enable, vk::TRUE);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE);
}

#[test]
fn disabled_blending_still_writes_all_channels() {
    let state = blend_attachment(BlendMode::Disabled);
    assert_eq!(state.blend_enable, vk::FALSE);
    assert_eq!(
        state.color_write_mask,
        vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A
    );
}
