//! Bring-up tests for the RHI. Every test needs a GPU and a display.
//!
//! Run with: cargo test --test gpu_smoke -- --ignored --test-threads=1
//! (one event loop at a time).

use std::sync::Arc;
use winit::event_loop::EventLoop;
use winit::window::Window;

use aster_rhi::{
    Buffer, BufferDesc, FramePool, ImmediateContext, RenderContext, RhiError, Swapchain,
    SwapchainConfig, Texture, TextureDesc, FRAMES_IN_FLIGHT,
};

/// Hidden window for headless-ish testing.
#[allow(deprecated)]
fn create_test_window() -> (Arc<Window>, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let attrs = Window::default_attributes()
        .with_title("aster-rhi test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false);
    let window = Arc::new(event_loop.create_window(attrs).unwrap());
    (window, event_loop)
}

#[test]
#[ignore] // Requires GPU
fn context_brings_up_a_device() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    assert!(!context.physical_device().name().is_empty());
    context.wait_until_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn allocations_round_trip_through_the_allocator() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    assert_eq!(context.memory().live_allocations(), 0);

    let buffer = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::storage("test.storage", 4096),
    )
    .unwrap();
    let texture = Texture::new(
        context.device(),
        context.memory(),
        &TextureDesc::new_color_attachment(64, 64, aster_rhi::vk::Format::R8G8B8A8_UNORM)
            .with_name("test.color"),
    )
    .unwrap();

    assert_eq!(context.memory().live_allocations(), 2);

    drop(buffer);
    assert_eq!(context.memory().live_allocations(), 1);
    drop(texture);
    assert_eq!(context.memory().live_allocations(), 0);
}

#[test]
#[ignore] // Requires GPU
fn host_visible_buffers_accept_writes_and_report_overruns() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let mut uniform = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::uniform("test.uniform", 256),
    )
    .unwrap();

    uniform.write_bytes(0, &[0xAAu8; 256]).unwrap();
    uniform.write_bytes(128, &[0x55u8; 128]).unwrap();

    let err = uniform.write_bytes(128, &[0u8; 256]).unwrap_err();
    assert!(matches!(err, RhiError::BufferWriteOutOfBounds { .. }));
}

#[test]
#[ignore] // Requires GPU
fn device_local_vertex_buffers_have_an_address() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let vertices = Buffer::new(
        context.device(),
        context.memory(),
        &BufferDesc::vertex("test.vertices", 1024),
    )
    .unwrap();

    assert_ne!(vertices.device_address(), 0);
}

#[test]
#[ignore] // Requires GPU
fn swapchain_respects_surface_constraints() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let swapchain = Swapchain::new(
        context.core(),
        context.device(),
        context.physical_device(),
        context.surface(),
        SwapchainConfig::default(),
    )
    .unwrap();

    let properties = context
        .surface()
        .query_properties(context.physical_device().handle())
        .unwrap();
    let capabilities = properties.capabilities;

    assert!(swapchain.image_count() >= capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        assert!(swapchain.image_count() <= capabilities.max_image_count);
    }
    assert!(properties
        .formats
        .iter()
        .any(|f| f.format == swapchain.format()));
    assert!(properties
        .present_modes
        .contains(&swapchain.present_mode()));
}

#[test]
#[ignore] // Requires GPU
fn swapchain_resize_is_idempotent() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let mut swapchain = Swapchain::new(
        context.core(),
        context.device(),
        context.physical_device(),
        context.surface(),
        SwapchainConfig::default(),
    )
    .unwrap();

    let target = aster_rhi::vk::Extent2D {
        width: 640,
        height: 480,
    };
    swapchain
        .resize(context.device(), context.surface(), target)
        .unwrap();
    let first = swapchain.extent();

    swapchain
        .resize(context.device(), context.surface(), first)
        .unwrap();
    assert_eq!(swapchain.extent(), first);

    // Zero-sized requests are dropped, not applied
    swapchain
        .resize(
            context.device(),
            context.surface(),
            aster_rhi::vk::Extent2D {
                width: 0,
                height: 0,
            },
        )
        .unwrap();
    assert_eq!(swapchain.extent(), first);
}

#[test]
#[ignore] // Requires GPU
fn immediate_submits_complete_back_to_back() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let immediate = ImmediateContext::new(context.device()).unwrap();

    immediate
        .submit_and_wait(context.device(), |encoder| {
            encoder.flush_all_writes();
        })
        .unwrap();
    // The fence must be reusable for the next submit
    immediate
        .submit_and_wait(context.device(), |encoder| {
            encoder.flush_all_writes();
        })
        .unwrap();
}

#[test]
#[ignore] // Requires GPU
fn frame_pool_creates_signaled_fences() {
    let (window, _event_loop) = create_test_window();
    let context = RenderContext::new(&window).unwrap();

    let mut pool = FramePool::new(context.device(), FRAMES_IN_FLIGHT).unwrap();

    // No frame has been submitted, so waiting must return immediately
    // rather than deadlock on an unsignaled fence.
    let first = pool.wait_next().unwrap();
    assert_eq!(first, 0);
    pool.end_frame();
    let second = pool.wait_next().unwrap();
    assert_eq!(second, 1);
}
