use super::*;

fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

fn capabilities(
    min_image_count: u32,
    max_image_count: u32,
    current: vk::Extent2D,
    min_extent: vk::Extent2D,
    max_extent: vk::Extent2D,
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count,
        max_image_count,
        current_extent: current,
        min_image_extent: min_extent,
        max_image_extent: max_extent,
        ..Default::default()
    }
}

fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space,
    }
}

#[test]
fn image_count_is_one_more_than_the_minimum() {
    let caps = capabilities(2, 0, extent(800, 600), extent(1, 1), extent(4096, 4096));
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn image_count_respects_the_driver_cap() {
    // min 3, max 3: min + 1 would be 4, cap brings it back to 3
    let caps = capabilities(3, 3, extent(800, 600), extent(1, 1), extent(4096, 4096));
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn image_count_ignores_a_zero_cap() {
    // max_image_count of zero means unbounded
    let caps = capabilities(4, 0, extent(800, 600), extent(1, 1), extent(4096, 4096));
    assert_eq!(choose_image_count(&caps), 5);
}

#[test]
fn extent_follows_the_driver_when_fixed() {
    let caps = capabilities(2, 0, extent(800, 600), extent(1, 1), extent(4096, 4096));
    // The framebuffer size is irrelevant when the driver pins the extent
    assert_eq!(surface_extent(&caps, extent(123, 456)), extent(800, 600));
}

#[test]
fn extent_clamps_the_framebuffer_when_the_driver_defers() {
    let caps = capabilities(
        2,
        0,
        extent(u32::MAX, u32::MAX),
        extent(100, 100),
        extent(2000, 2000),
    );

    assert_eq!(surface_extent(&caps, extent(5000, 10)), extent(2000, 100));
    assert_eq!(surface_extent(&caps, extent(640, 480)), extent(640, 480));
}

#[test]
fn extent_selection_is_idempotent() {
    let caps = capabilities(
        2,
        0,
        extent(u32::MAX, u32::MAX),
        extent(100, 100),
        extent(2000, 2000),
    );

    let once = surface_extent(&caps, extent(5000, 10));
    let twice = surface_extent(&caps, once);
    assert_eq!(once, twice);
}

#[test]
fn preferred_format_wins_when_offered() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];

    let chosen = choose_surface_format(&formats, &SwapchainConfig::default());
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn first_format_wins_when_the_preference_is_missing() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];

    let chosen = choose_surface_format(&formats, &SwapchainConfig::default());
    assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn constrained_surface_falls_back_to_unorm_and_fifo() {
    // A surface that only offers a UNORM format and FIFO
    let formats = [surface_format(
        vk::Format::R8G8B8A8_UNORM,
        vk::ColorSpaceKHR::SRGB_NONLINEAR,
    )];
    let modes = [vk::PresentModeKHR::FIFO];
    let config = SwapchainConfig::default();

    assert_eq!(
        choose_surface_format(&formats, &config).format,
        vk::Format::R8G8B8A8_UNORM
    );
    assert_eq!(choose_present_mode(&modes, &config), vk::PresentModeKHR::FIFO);
}

#[test]
fn mailbox_is_preferred_over_fifo() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
    let chosen = choose_present_mode(&modes, &SwapchainConfig::default());
    assert_eq!(chosen, vk::PresentModeKHR::MAILBOX);
}

#[test]
fn explicit_preference_overrides_the_mailbox_fallback() {
    let modes = [
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::FIFO,
    ];
    let config = SwapchainConfig {
        preferred_present_mode: vk::PresentModeKHR::IMMEDIATE,
        ..Default::default()
    };

    assert_eq!(choose_present_mode(&modes, &config), vk::PresentModeKHR::IMMEDIATE);
}
