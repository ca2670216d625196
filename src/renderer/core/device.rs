use color_eyre::Result;
use crate::renderer::util::DepthRange;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderLanguage {
    /// `#version 330 core`, one source per stage
    Glsl330,
    /// Shader model 4, both entry points in one source
    Hlsl,
}

/// Low-level GPU command surface of a backend.
///
/// Handles are owned by the caller and must be returned through the matching `delete_*` call
/// exactly once. None of the methods resolve names at draw time; lookups happen through
/// [`GraphicsDevice::uniform_block_index`] and [`GraphicsDevice::attribute_location`] only.
pub trait GraphicsDevice {
    type Stage;
    type Program;
    type Buffer;

    const LANGUAGE: ShaderLanguage;
    const DEPTH_RANGE: DepthRange;

    /// Depth test, face culling and other fixed state used by every draw
    fn apply_default_state(&mut self);
    fn set_viewport(&mut self, width: u32, height: u32);
    /// Clears color, depth and stencil
    fn clear(&mut self, color: [f32; 4]);

    /// Creates a stage object and compiles `source` into it
    fn create_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage>;
    fn stage_compiled(&self, stage: &Self::Stage) -> bool;
    fn stage_info_log(&self, stage: &Self::Stage) -> String;
    fn delete_stage(&mut self, stage: Self::Stage);

    fn create_program(&mut self) -> Result<Self::Program>;
    fn attach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage);
    fn link_program(&mut self, program: &mut Self::Program);
    fn program_linked(&self, program: &Self::Program) -> bool;
    fn program_info_log(&self, program: &Self::Program) -> String;
    fn detach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage);
    fn delete_program(&mut self, program: Self::Program);

    fn uniform_block_index(&mut self, program: &Self::Program, name: &str) -> Option<u32>;
    fn bind_uniform_block(&mut self, program: &Self::Program, block_index: u32, binding: u32);
    fn attribute_location(&mut self, program: &Self::Program, name: &str) -> Option<u32>;

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<Self::Buffer>;
    /// Writes `data` at `offset` bytes into the buffer, leaving the rest untouched
    fn update_buffer(&mut self, buffer: &mut Self::Buffer, offset: usize, data: &[u8]);
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn use_program(&mut self, program: &Self::Program);
    fn bind_geometry(
        &mut self,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
        position_location: u32,
        vertex_stride: u32,
    );
    fn bind_uniform_buffer(&mut self, binding: u32, buffer: &Self::Buffer);
    /// Draws `index_count` 16-bit indices as a triangle list
    fn draw_indexed(&mut self, index_count: u32);
}
