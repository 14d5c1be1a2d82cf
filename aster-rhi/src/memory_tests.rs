use super::*;

#[test]
fn pool_sizes_scale_with_max_sets() {
    let sizes = descriptor_pool_sizes(1024);

    let of = |ty: vk::DescriptorType| {
        sizes
            .iter()
            .find(|s| s.ty == ty)
            .map(|s| s.descriptor_count)
    };

    assert_eq!(of(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), Some(2048));
    assert_eq!(of(vk::DescriptorType::UNIFORM_BUFFER), Some(1024));
    assert_eq!(of(vk::DescriptorType::STORAGE_BUFFER), Some(1024));
    assert_eq!(of(vk::DescriptorType::STORAGE_IMAGE), Some(512));
}

#[test]
fn pool_sizes_list_each_type_once() {
    let sizes = descriptor_pool_sizes(64);

    for (i, a) in sizes.iter().enumerate() {
        for b in &sizes[i + 1..] {
            assert_ne!(a.ty, b.ty, "duplicate descriptor type in pool sizes");
        }
    }
}

#[test]
fn pool_sizes_never_zero_for_small_pools() {
    // max_sets of 2 is the smallest a frame pool would ever ask for
    for size in descriptor_pool_sizes(2) {
        assert!(size.descriptor_count > 0, "{:?} rounded down to zero", size.ty);
    }
}
