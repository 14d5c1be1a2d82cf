//! The scene renderer.
//!
//! One [`SceneRenderer::render`] call runs a whole frame: acquire a swapchain
//! image, paint the background by compute, rasterize the scene's meshes, let
//! an optional overlay draw on top, then blit to the swapchain and present.
//! The caller owns the RHI context and passes it in by reference; the
//! renderer owns everything frame-shaped (swapchain, targets, frame pool,
//! pipelines, uploaded meshes).

use aster_rhi::{
    Buffer, BufferDesc, CommandEncoder, DescriptorSetLayout, DescriptorWriter, FRAMES_IN_FLIGHT,
    FramePool, GraphicsPipelineDesc, ImmediateContext, MemoryLocation, Pipeline, PresentState,
    RenderContext, RhiError, Sampler, SamplerConfig, ShaderModule, ShaderStage, Swapchain,
    SwapchainConfig, Texture, TextureState, draw_push_constant_range, standard_mesh_bindings, vk,
};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::path::Path;

use crate::background::BackgroundPass;
use crate::mesh::{MeshBuffers, Vertex, upload_mesh, upload_texture};
use crate::targets::RenderTargets;

/// Object-transform capacity of one frame's storage buffer. Scenes past this
/// are drawn truncated, with a warning.
pub const MAX_OBJECTS: usize = 1024;

/// Per-frame uniform block read by the mesh shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuSceneData {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

/// Push constants of the mesh pipeline: where to pull vertices from, and
/// which transform in the object buffer belongs to this draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DrawPushConstants {
    vertex_buffer: vk::DeviceAddress,
    object_index: u32,
    _padding: u32,
}

/// Handle to a mesh uploaded through [`SceneRenderer::create_mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(usize);

/// One draw: a mesh and its world transform.
#[derive(Clone, Copy, Debug)]
pub struct RenderObject {
    pub mesh: MeshHandle,
    pub transform: Mat4,
}

/// Everything the renderer needs for one frame, borrowed from the caller.
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
    pub view: Mat4,
    pub projection: Mat4,
    pub objects: &'a [RenderObject],
}

/// Outcome of a presented frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum RenderStatus {
    Presented,
    /// The frame went out best-effort but the swapchain no longer matches
    /// the surface. Call [`SceneRenderer::resize`] before the next frame.
    SwapchainStale,
}

/// Extra pass recorded after scene geometry, inside an active rendering
/// scope targeting the draw image. Meant for debug UI layers.
pub trait OverlayPass {
    fn record(
        &mut self,
        encoder: &CommandEncoder,
        target: OverlayTarget,
    ) -> Result<(), RhiError>;
}

/// What the overlay is drawing into.
#[derive(Clone, Copy, Debug)]
pub struct OverlayTarget {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
}

/// SPIR-V binaries for the renderer's built-in passes.
#[derive(Debug)]
pub struct SceneShaderSources {
    pub mesh_vertex: Vec<u8>,
    pub mesh_fragment: Vec<u8>,
    pub background: Vec<u8>,
}

impl SceneShaderSources {
    /// Load the standard shader set from a directory of `.spv` files.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, RhiError> {
        let dir = dir.as_ref();
        Ok(Self {
            mesh_vertex: read_spirv(&dir.join("mesh.vert.spv"))?,
            mesh_fragment: read_spirv(&dir.join("mesh.frag.spv"))?,
            background: read_spirv(&dir.join("background.comp.spv"))?,
        })
    }
}

fn read_spirv(path: &Path) -> Result<Vec<u8>, RhiError> {
    std::fs::read(path).map_err(|source| RhiError::ShaderLoad {
        path: path.to_owned(),
        source,
    })
}

/// Buffers and descriptor set owned by one frame-in-flight slot.
struct FrameResources {
    uniform: Buffer,
    objects: Buffer,
    set: vk::DescriptorSet,
}

impl FrameResources {
    fn new(
        context: &RenderContext,
        layout: &DescriptorSetLayout,
        index: usize,
    ) -> Result<Self, RhiError> {
        let uniform = Buffer::new(
            context.device(),
            context.memory(),
            &BufferDesc::uniform(
                &format!("frame{index}.scene"),
                std::mem::size_of::<GpuSceneData>() as u64,
            ),
        )?;
        let objects = Buffer::new(
            context.device(),
            context.memory(),
            &BufferDesc::storage(&format!("frame{index}.objects"), object_buffer_size())
                .with_location(MemoryLocation::CpuToGpu),
        )?;

        let set = context.memory().descriptor_pool().allocate(layout)?;
        DescriptorWriter::new()
            .write_buffer(
                0,
                vk::DescriptorType::STORAGE_BUFFER,
                objects.handle(),
                0,
                vk::WHOLE_SIZE,
            )
            .write_buffer(
                1,
                vk::DescriptorType::UNIFORM_BUFFER,
                uniform.handle(),
                0,
                vk::WHOLE_SIZE,
            )
            .update(context.device().handle(), set);

        Ok(Self {
            uniform,
            objects,
            set,
        })
    }
}

/// Size in bytes of one frame's object-transform buffer.
fn object_buffer_size() -> vk::DeviceSize {
    (MAX_OBJECTS * std::mem::size_of::<Mat4>()) as vk::DeviceSize
}

/// Fold the acquire and present signals into what the caller should do next.
fn frame_status(suboptimal_acquire: bool, present: PresentState) -> RenderStatus {
    if suboptimal_acquire || present == PresentState::Stale {
        RenderStatus::SwapchainStale
    } else {
        RenderStatus::Presented
    }
}

pub struct SceneRenderer {
    // Swapchain first: its drop waits for the device to go idle, which
    // covers every resource dropped after it.
    swapchain: Swapchain,
    frame_pool: FramePool,
    immediate: ImmediateContext,
    targets: RenderTargets,
    background: BackgroundPass,
    mesh_pipeline: Pipeline,
    mesh_set_layout: DescriptorSetLayout,
    default_sampler: Sampler,
    frames: Vec<FrameResources>,
    meshes: Vec<MeshBuffers>,
    overlay: Option<Box<dyn OverlayPass>>,
}

impl SceneRenderer {
    #[profiling::function]
    pub fn new(context: &RenderContext, shaders: &SceneShaderSources) -> Result<Self, RhiError> {
        let swapchain = Swapchain::new(
            context.core(),
            context.device(),
            context.physical_device(),
            context.surface(),
            SwapchainConfig::default(),
        )?;
        let targets = RenderTargets::new(context, swapchain.extent())?;
        let frame_pool = FramePool::new(context.device(), FRAMES_IN_FLIGHT)?;
        let immediate = ImmediateContext::new(context.device())?;

        let vertex_shader = ShaderModule::from_spirv(
            "shader.mesh_vertex",
            context.device(),
            &shaders.mesh_vertex,
            ShaderStage::Vertex,
        )?;
        let fragment_shader = ShaderModule::from_spirv(
            "shader.mesh_fragment",
            context.device(),
            &shaders.mesh_fragment,
            ShaderStage::Fragment,
        )?;
        let background_shader = ShaderModule::from_spirv(
            "shader.background",
            context.device(),
            &shaders.background,
            ShaderStage::Compute,
        )?;

        let mesh_set_layout =
            DescriptorSetLayout::new(context.device().handle(), &standard_mesh_bindings())?;
        let pipeline_desc =
            GraphicsPipelineDesc::new(&vertex_shader, &fragment_shader, targets.color_format())
                .with_depth_format(targets.depth_format());
        let mesh_pipeline = Pipeline::new_graphics(
            "pipeline.mesh",
            context.device(),
            &pipeline_desc,
            &[mesh_set_layout.handle()],
            &[draw_push_constant_range()],
        )?;

        let background = BackgroundPass::new(context, &background_shader)?;
        background.attach(context, targets.draw())?;

        let default_sampler =
            Sampler::new("sampler.default", context.device(), &SamplerConfig::linear())?;

        let frames = (0..FRAMES_IN_FLIGHT)
            .map(|index| FrameResources::new(context, &mesh_set_layout, index))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Scene renderer ready: {}x{}, {} swapchain images, {} frames in flight",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.image_count(),
            FRAMES_IN_FLIGHT,
        );

        Ok(Self {
            swapchain,
            frame_pool,
            immediate,
            targets,
            background,
            mesh_pipeline,
            mesh_set_layout,
            default_sampler,
            frames,
            meshes: Vec::new(),
            overlay: None,
        })
    }

    /// Render and present one frame.
    ///
    /// Returns [`RenderStatus::SwapchainStale`] when the surface changed
    /// under the swapchain; the caller resizes and the next frame recovers.
    /// A stale surface discovered at acquire aborts the frame before any
    /// recording, leaving the slot reusable.
    #[profiling::function]
    pub fn render(
        &mut self,
        context: &RenderContext,
        scene: &SceneView,
    ) -> Result<RenderStatus, RhiError> {
        let slot = self.frame_pool.wait_next()?;

        let acquired = match self
            .swapchain
            .acquire(self.frame_pool.frame(slot).acquire_semaphore())
        {
            Ok(acquired) => acquired,
            Err(e) if e.is_stale_swapchain() => return Ok(RenderStatus::SwapchainStale),
            Err(e) => return Err(e),
        };

        self.upload_frame_data(slot, scene)?;

        let encoder = self.frame_pool.begin_recording(context.device(), slot)?;
        let draw = self.targets.draw();
        let extent = self.targets.extent();

        // Background by compute, straight into the draw target
        encoder.transition_texture(draw, TextureState::Undefined, TextureState::General);
        self.background.record(&encoder, extent);

        // Geometry on top of the gradient
        encoder.transition_texture(draw, TextureState::General, TextureState::Color);
        encoder.transition_texture(
            self.targets.depth(),
            TextureState::Undefined,
            TextureState::DepthStencil,
        );
        self.record_geometry(&encoder, slot, scene)?;

        if let Some(overlay) = self.overlay.as_mut() {
            let color_attachment = vk::RenderingAttachmentInfo::default()
                .image_view(draw.view()?)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE);
            let rendering_info = vk::RenderingInfo::default()
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D::default(),
                    extent,
                })
                .layer_count(1)
                .color_attachments(std::slice::from_ref(&color_attachment));

            encoder.begin_rendering(&rendering_info);
            let result = overlay.record(
                &encoder,
                OverlayTarget {
                    extent,
                    format: draw.format(),
                },
            );
            // The scope must close even when the overlay fails
            encoder.end_rendering();
            result?;
        }

        // Blit to the swapchain image and hand it to the presenter
        let backbuffer = self.swapchain.texture(acquired.index);
        encoder.transition_texture(draw, TextureState::Color, TextureState::TransferSrc);
        encoder.transition_texture(backbuffer, TextureState::Undefined, TextureState::TransferDst);
        blit_whole_image(&encoder, draw, backbuffer);
        encoder.transition_texture(backbuffer, TextureState::TransferDst, TextureState::Present);

        self.frame_pool.submit(context.device(), slot, &encoder)?;

        let present_state = self.swapchain.present(
            context.surface(),
            context.device().present_queue(),
            acquired.index,
            self.frame_pool.frame(slot).render_semaphore(),
        )?;
        self.frame_pool.end_frame();

        Ok(frame_status(acquired.suboptimal, present_state))
    }

    /// Recreate the swapchain and render targets for a new surface size.
    /// Zero extents (minimized window) are ignored, and resizing to the
    /// current size is a no-op beyond the swapchain's own re-query.
    #[profiling::function]
    pub fn resize(&mut self, context: &RenderContext, extent: vk::Extent2D) -> Result<(), RhiError> {
        if extent.width == 0 || extent.height == 0 {
            return Ok(());
        }

        // resize waits for the device to idle, so the old targets are free
        self.swapchain
            .resize(context.device(), context.surface(), extent)?;
        self.targets = RenderTargets::new(context, self.swapchain.extent())?;
        self.background.attach(context, self.targets.draw())?;

        log::debug!(
            "Renderer resized to {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }

    /// Upload a mesh and keep it alive for the renderer's lifetime.
    pub fn create_mesh(
        &mut self,
        context: &RenderContext,
        name: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshHandle, RhiError> {
        let mesh = upload_mesh(context, &self.immediate, name, vertices, indices)?;
        self.meshes.push(mesh);
        Ok(MeshHandle(self.meshes.len() - 1))
    }

    /// Upload pixel data into a sampled texture owned by the caller.
    pub fn create_texture(
        &self,
        context: &RenderContext,
        name: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: vk::Format,
    ) -> Result<Texture, RhiError> {
        upload_texture(context, &self.immediate, name, pixels, width, height, format)
    }

    /// Record and run GPU work outside the frame loop, blocking until it
    /// completes.
    pub fn immediate_submit<F>(&self, context: &RenderContext, record: F) -> Result<(), RhiError>
    where
        F: FnOnce(&CommandEncoder),
    {
        self.immediate.submit_and_wait(context.device(), record)
    }

    pub fn set_overlay(&mut self, overlay: Box<dyn OverlayPass>) {
        self.overlay = Some(overlay);
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn background_mut(&mut self) -> &mut BackgroundPass {
        &mut self.background
    }

    /// Layout of the per-frame mesh descriptor set, for passes that want to
    /// allocate compatible sets of their own.
    pub fn mesh_set_layout(&self) -> &DescriptorSetLayout {
        &self.mesh_set_layout
    }

    /// Linear sampler for textures created through [`Self::create_texture`]
    /// and for overlay recorders that bind their own images.
    pub fn default_sampler(&self) -> &Sampler {
        &self.default_sampler
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshBuffers> {
        self.meshes.get(handle.0)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.swapchain.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    fn upload_frame_data(&mut self, slot: usize, scene: &SceneView) -> Result<(), RhiError> {
        let scene_data = GpuSceneData {
            view: scene.view,
            projection: scene.projection,
            view_projection: scene.projection * scene.view,
        };

        if scene.objects.len() > MAX_OBJECTS {
            log::warn!(
                "Scene has {} objects; drawing the first {MAX_OBJECTS}",
                scene.objects.len()
            );
        }
        let transforms: Vec<Mat4> = scene
            .objects
            .iter()
            .take(MAX_OBJECTS)
            .map(|object| object.transform)
            .collect();

        let frame = &mut self.frames[slot];
        frame.uniform.write_bytes(0, bytemuck::bytes_of(&scene_data))?;
        if !transforms.is_empty() {
            frame.objects.write_bytes(0, bytemuck::cast_slice(&transforms))?;
        }
        Ok(())
    }

    fn record_geometry(
        &self,
        encoder: &CommandEncoder,
        slot: usize,
        scene: &SceneView,
    ) -> Result<(), RhiError> {
        let extent = self.targets.extent();

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.targets.draw().view()?)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::LOAD)
            .store_op(vk::AttachmentStoreOp::STORE);
        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.targets.depth().view()?)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment))
            .depth_attachment(&depth_attachment);

        encoder.begin_rendering(&rendering_info);

        encoder.set_viewport(
            0,
            &[vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }],
        );
        encoder.set_scissor(
            0,
            &[vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            }],
        );

        encoder.bind_pipeline(&self.mesh_pipeline);
        encoder.bind_descriptor_sets(&self.mesh_pipeline, 0, &[self.frames[slot].set]);

        for (object_index, object) in scene.objects.iter().take(MAX_OBJECTS).enumerate() {
            let Some(mesh) = self.meshes.get(object.mesh.0) else {
                log::warn!("Skipping draw with unknown mesh handle {}", object.mesh.0);
                continue;
            };

            encoder.push_constants(
                self.mesh_pipeline.layout(),
                vk::ShaderStageFlags::VERTEX,
                0,
                &DrawPushConstants {
                    vertex_buffer: mesh.vertex_address(),
                    object_index: object_index as u32,
                    _padding: 0,
                },
            );
            encoder.bind_index_buffer(mesh.index_buffer().handle(), 0, vk::IndexType::UINT32);
            encoder.draw_indexed(mesh.index_count(), 1, 0, 0, 0);
        }

        encoder.end_rendering();
        Ok(())
    }
}

/// Blit the full extent of `src` onto the full extent of `dst`.
fn blit_whole_image(encoder: &CommandEncoder, src: &Texture, dst: &Texture) {
    let subresource = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    let region = vk::ImageBlit {
        src_subresource: subresource,
        src_offsets: [
            vk::Offset3D::default(),
            vk::Offset3D {
                x: src.width() as i32,
                y: src.height() as i32,
                z: 1,
            },
        ],
        dst_subresource: subresource,
        dst_offsets: [
            vk::Offset3D::default(),
            vk::Offset3D {
                x: dst.width() as i32,
                y: dst.height() as i32,
                z: 1,
            },
        ],
    };
    encoder.blit_image(
        src.handle(),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        dst.handle(),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &[region],
        vk::Filter::LINEAR,
    );
}

#[cfg(test)]
#[path = "scene_renderer_tests.rs"]
mod tests;
