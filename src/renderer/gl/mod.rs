/// OpenGL 3.3 core backend. `device` translates [`GraphicsDevice`] calls into `glow` calls and
/// `context` owns the window surface created through `glutin`.
///
/// [`GraphicsDevice`]: crate::renderer::core::device::GraphicsDevice

pub mod context;
pub mod device;

use crate::renderer::core::renderer::CubeRenderer;

pub type GlRenderer = CubeRenderer<device::GlDevice>;
