/// Direct3D 11 backend, compiled on Windows only. Shaders are HLSL compiled at runtime with
/// `D3DCompile`; the swap chain lives in `context`.

pub mod context;
pub mod device;

use crate::renderer::core::renderer::CubeRenderer;

pub type D3D11Renderer = CubeRenderer<device::D3D11Device>;
