//! Scene rendering on top of the RHI.
//!
//! [`SceneRenderer`] owns the swapchain, render targets, frame pool and
//! pipelines, and turns a [`SceneView`] into a presented frame. Mesh and
//! texture data enters through its upload helpers; a [`OverlayPass`] can be
//! installed to draw on top of the scene.

pub mod background;
pub mod mesh;
pub mod scene_renderer;
pub mod targets;

pub use background::{BackgroundPass, GradientParams};
pub use mesh::{MeshBuffers, Vertex, upload_mesh, upload_texture};
pub use scene_renderer::{
    GpuSceneData, MAX_OBJECTS, MeshHandle, OverlayPass, OverlayTarget, RenderObject, RenderStatus,
    SceneRenderer, SceneShaderSources, SceneView,
};
pub use targets::{DRAW_FORMAT, RenderTargets};
