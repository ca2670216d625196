pub mod camera;
pub mod config;
pub mod context;
pub mod util;
pub mod gl;
#[cfg(windows)]
pub mod d3d11;

mod core;
mod shader_data;
mod resources;

use color_eyre::Result;
use crate::renderer::camera::SharedCamera;
use crate::renderer::resources::light::PointLight;
use crate::renderer::shader_data::LIGHT_COUNT;

pub use crate::renderer::context::{ContextApi, ContextFactory};

/// Backend-agnostic frame drawing.
///
/// A frame is `begin_frame`, any number of `render_*` calls, then `end_frame`. Drawing outside
/// that bracket, or beginning a frame twice, is an error. Draws are silent no-ops while no
/// camera is active or when `init_renderer` failed.
pub trait Renderer {
    /// Compiles the cube program and uploads the cube mesh. On failure the error has already
    /// been logged and the renderer stays undrawable.
    fn init_renderer(&mut self) -> Result<()>;

    /// Releases every GPU object that was created. Safe after a failed or partial
    /// `init_renderer` and safe to call more than once.
    fn destroy_renderer(&mut self);

    fn begin_frame(&mut self) -> Result<()>;

    /// Reserved for world chunk rendering, draws nothing
    fn render_chunks(&mut self) -> Result<()>;

    fn render_single_cube(&mut self) -> Result<()>;

    fn render_cube_grid(&mut self) -> Result<()>;

    fn end_frame(&mut self) -> Result<()>;

    /// Keeps a weak reference; the renderer never extends the camera's lifetime
    fn set_active_scene_camera(&mut self, camera: Option<&SharedCamera>);

    fn set_point_lights(&mut self, lights: [PointLight; LIGHT_COUNT]);

    fn resize(&mut self, width: u32, height: u32);
}
