#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::Path;

use aster::core::camera::{Camera, CameraController};
use aster::core::cli::EngineArgs;
use aster::core::input::InputActionMapper;
use aster::renderer::{
    GradientParams, MeshHandle, RenderObject, SceneShaderSources, SceneView, Vertex,
};
use aster::{App, Engine, RenderableApp, launch};
use glam::{Mat4, Vec3, Vec4};
use winit::event::{DeviceEvent, WindowEvent};
use winit::keyboard::KeyCode;
use winit::window::Window;

const SPIN_RATE: f32 = 0.9;
const MOUSE_SENSITIVITY: f32 = 0.4;
const AXIS_SMOOTHING: f32 = 0.2;

/// Spinning cubes over a compute gradient, with a free-fly camera.
/// Hold the left mouse button for mouse look, WASD + QE to move.
pub struct SimpleApp {
    camera: Camera,
    controller: CameraController,
    input: InputActionMapper,

    cube: Option<MeshHandle>,
    objects: Vec<RenderObject>,
    spin: f32,
}

impl App for SimpleApp {
    fn new(args: &EngineArgs) -> anyhow::Result<Self> {
        if !args.args.is_empty() {
            log::info!("Ignoring extra arguments: {:?}", args.args);
        }

        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, -8.0, 2.5));
        // Tip the view down toward the origin, where the cubes sit.
        camera.apply(0.0, -0.3, Vec3::ZERO, std::f32::consts::FRAC_PI_2);

        let mut input = InputActionMapper::new();
        input.register_axis("move_forward", [KeyCode::KeyW], [KeyCode::KeyS], AXIS_SMOOTHING);
        input.register_axis("move_right", [KeyCode::KeyD], [KeyCode::KeyA], AXIS_SMOOTHING);
        input.register_axis("move_up", [KeyCode::KeyE], [KeyCode::KeyQ], AXIS_SMOOTHING);

        Ok(Self {
            camera,
            controller: CameraController::new(MOUSE_SENSITIVITY),
            input,
            cube: None,
            objects: Vec::new(),
            spin: 0.0,
        })
    }

    fn on_window_event(&mut self, event: &WindowEvent, window: &Window) {
        self.input.on_window_event(event);
        self.controller.on_window_event(event, window);
    }

    fn on_device_event(&mut self, event: &DeviceEvent) {
        self.controller.on_device_event(event);
    }

    #[profiling::function]
    fn tick(&mut self, delta_time: f32) {
        self.input.tick(delta_time);
        self.controller.update(
            delta_time,
            self.input.get_axis("move_forward"),
            self.input.get_axis("move_right"),
            self.input.get_axis("move_up"),
            &mut self.camera,
        );

        self.spin += delta_time * SPIN_RATE;
        self.rebuild_objects();
    }
}

impl RenderableApp for SimpleApp {
    fn shader_sources(&self) -> anyhow::Result<SceneShaderSources> {
        // Resolved against the crate so `cargo run` works from any directory.
        // Run content/shaders/compile.sh first to produce the .spv files.
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("content/shaders");
        Ok(SceneShaderSources::load_from_dir(dir)?)
    }

    fn prepare(&mut self, engine: &mut Engine) -> anyhow::Result<()> {
        self.camera.set_aspect_ratio(engine.renderer().aspect_ratio());

        let (vertices, indices) = cube_mesh(1.0);
        self.cube = Some(engine.create_mesh("cube", &vertices, &indices)?);

        engine
            .renderer_mut()
            .background_mut()
            .set_params(GradientParams {
                top: Vec4::new(0.25, 0.1, 0.35, 1.0),
                bottom: Vec4::new(0.02, 0.02, 0.08, 1.0),
            });

        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.set_aspect_ratio(width as f32 / height as f32);
        }
    }

    fn scene(&mut self) -> SceneView<'_> {
        SceneView {
            view: self.camera.view(),
            projection: self.camera.projection(),
            objects: &self.objects,
        }
    }
}

impl SimpleApp {
    fn rebuild_objects(&mut self) {
        self.objects.clear();
        let Some(cube) = self.cube else {
            return;
        };

        self.objects.push(RenderObject {
            mesh: cube,
            transform: Mat4::from_rotation_z(self.spin) * Mat4::from_rotation_x(self.spin * 0.6),
        });

        // Two half-size satellites orbiting the other way.
        for side in [-1.0f32, 1.0] {
            let transform = Mat4::from_rotation_z(side * -0.7 * self.spin)
                * Mat4::from_translation(Vec3::new(side * 3.5, 0.0, 0.0))
                * Mat4::from_scale(Vec3::splat(0.5));
            self.objects.push(RenderObject {
                mesh: cube,
                transform,
            });
        }
    }
}

/// Face-colored cube, wound counter-clockwise seen from outside so the
/// back-face culling in the mesh pipeline keeps the visible sides.
fn cube_mesh(half_extent: f32) -> (Vec<Vertex>, Vec<u32>) {
    struct Face {
        normal: Vec3,
        corners: [Vec3; 4],
        color: Vec4,
    }

    let faces = [
        Face {
            normal: Vec3::X,
            corners: [
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
            ],
            color: Vec4::new(0.9, 0.2, 0.2, 1.0),
        },
        Face {
            normal: Vec3::NEG_X,
            corners: [
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
            color: Vec4::new(0.5, 0.1, 0.1, 1.0),
        },
        Face {
            normal: Vec3::Y,
            corners: [
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
            ],
            color: Vec4::new(0.2, 0.9, 0.2, 1.0),
        },
        Face {
            normal: Vec3::NEG_Y,
            corners: [
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(-1.0, -1.0, 1.0),
            ],
            color: Vec4::new(0.1, 0.5, 0.1, 1.0),
        },
        Face {
            normal: Vec3::Z,
            corners: [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
            color: Vec4::new(0.2, 0.2, 0.9, 1.0),
        },
        Face {
            normal: Vec3::NEG_Z,
            corners: [
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
            ],
            color: Vec4::new(0.1, 0.1, 0.5, 1.0),
        },
    ];

    const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(faces.len() * 4);
    let mut indices = Vec::with_capacity(faces.len() * 6);

    for face in &faces {
        let base = vertices.len() as u32;
        for (corner, uv) in face.corners.iter().zip(CORNER_UVS) {
            vertices.push(Vertex::new(*corner * half_extent, face.normal, uv, face.color));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    launch::<SimpleApp>().expect("Failed to launch aster engine loop!");
}
