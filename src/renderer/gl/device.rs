use color_eyre::Result;
use color_eyre::eyre::eyre;
use glow::HasContext;
use crate::renderer::core::device::{BufferKind, GraphicsDevice, ShaderLanguage, StageKind};
use crate::renderer::util::DepthRange;

pub struct GlBuffer {
    buffer: glow::Buffer,
    target: u32,
}

/// Wraps a loaded `glow` context. Every call assumes the owning GL context is current on this
/// thread, which [`GlContext`](crate::renderer::gl::context::GlContext) guarantees.
pub struct GlDevice {
    gl: glow::Context,
    // Core profile refuses attribute setup without a bound vertex array
    vertex_array: Option<glow::VertexArray>,
}

impl GlDevice {
    const MAX_REPORTED_ERRORS: usize = 8;

    pub fn new(gl: glow::Context) -> Result<Self> {
        let vertex_array = unsafe { gl.create_vertex_array() }
            .map_err(|e| eyre!("Failed to create vertex array: {e}"))?;
        unsafe { gl.bind_vertex_array(Some(vertex_array)) };

        let device = Self {
            gl,
            vertex_array: Some(vertex_array),
        };
        log::info!("OpenGL device: {}", device.describe());
        Ok(device)
    }

    pub fn describe(&self) -> String {
        unsafe {
            format!(
                "{} ({}, GLSL {})",
                self.gl.get_parameter_string(glow::RENDERER),
                self.gl.get_parameter_string(glow::VERSION),
                self.gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
            )
        }
    }

    fn check_error(&self, label: &str) {
        for error in Self::drain_errors(|| unsafe { self.gl.get_error() }) {
            log::error!("OpenGL error 0x{error:04X} after {label}");
        }
    }

    /// Polls until `NO_ERROR`. A lost context keeps reporting errors forever, so stop after a
    /// handful.
    fn drain_errors(mut poll: impl FnMut() -> u32) -> Vec<u32> {
        let mut errors = Vec::new();
        while errors.len() < Self::MAX_REPORTED_ERRORS {
            let error = poll();
            if error == glow::NO_ERROR {
                break;
            }
            errors.push(error);
        }
        errors
    }

    fn buffer_target(kind: BufferKind) -> u32 {
        match kind {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
            BufferKind::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

impl GraphicsDevice for GlDevice {
    type Stage = glow::Shader;
    type Program = glow::Program;
    type Buffer = GlBuffer;

    const LANGUAGE: ShaderLanguage = ShaderLanguage::Glsl330;
    const DEPTH_RANGE: DepthRange = DepthRange::NegativeOneToOne;

    fn apply_default_state(&mut self) {
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(glow::LESS);
            self.gl.enable(glow::CULL_FACE);
            self.gl.cull_face(glow::BACK);
            // Cube faces are wound clockwise seen from outside
            self.gl.front_face(glow::CW);
        }
        self.check_error("apply_default_state");
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) };
        self.check_error("set_viewport");
    }

    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }

    fn create_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage> {
        let shader_type = match kind {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl
                .create_shader(shader_type)
                .map_err(|e| eyre!("Failed to create {kind:?} shader: {e}"))?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            Ok(shader)
        }
    }

    fn stage_compiled(&self, stage: &Self::Stage) -> bool {
        unsafe { self.gl.get_shader_compile_status(*stage) }
    }

    fn stage_info_log(&self, stage: &Self::Stage) -> String {
        unsafe { self.gl.get_shader_info_log(*stage) }
    }

    fn delete_stage(&mut self, stage: Self::Stage) {
        unsafe { self.gl.delete_shader(stage) };
    }

    fn create_program(&mut self) -> Result<Self::Program> {
        unsafe { self.gl.create_program() }
            .map_err(|e| eyre!("Failed to create program: {e}"))
    }

    fn attach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        unsafe { self.gl.attach_shader(*program, *stage) };
    }

    fn link_program(&mut self, program: &mut Self::Program) {
        unsafe { self.gl.link_program(*program) };
    }

    fn program_linked(&self, program: &Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(*program) }
    }

    fn program_info_log(&self, program: &Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(*program) }
    }

    fn detach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        unsafe { self.gl.detach_shader(*program, *stage) };
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) };
    }

    fn uniform_block_index(&mut self, program: &Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_uniform_block_index(*program, name) }
    }

    fn bind_uniform_block(&mut self, program: &Self::Program, block_index: u32, binding: u32) {
        unsafe { self.gl.uniform_block_binding(*program, block_index, binding) };
        self.check_error("bind_uniform_block");
    }

    fn attribute_location(&mut self, program: &Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(*program, name) }
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<Self::Buffer> {
        let target = Self::buffer_target(kind);
        let usage = match kind {
            BufferKind::Uniform => glow::DYNAMIC_DRAW,
            BufferKind::Vertex | BufferKind::Index => glow::STATIC_DRAW,
        };
        let buffer = unsafe {
            let buffer = self.gl
                .create_buffer()
                .map_err(|e| eyre!("Failed to create {kind:?} buffer: {e}"))?;
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, usage);
            self.gl.bind_buffer(target, None);
            buffer
        };
        self.check_error("create_buffer");
        Ok(GlBuffer { buffer, target })
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, offset: usize, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(buffer.target, Some(buffer.buffer));
            self.gl.buffer_sub_data_u8_slice(buffer.target, offset as i32, data);
        }
        self.check_error("update_buffer");
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer.buffer) };
    }

    fn use_program(&mut self, program: &Self::Program) {
        unsafe { self.gl.use_program(Some(*program)) };
        self.check_error("use_program");
    }

    fn bind_geometry(
        &mut self,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
        position_location: u32,
        vertex_stride: u32,
    ) {
        unsafe {
            self.gl.bind_vertex_array(self.vertex_array);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertices.buffer));
            self.gl.enable_vertex_attrib_array(position_location);
            self.gl.vertex_attrib_pointer_f32(
                position_location,
                3,
                glow::FLOAT,
                false,
                vertex_stride as i32,
                0,
            );
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices.buffer));
        }
        self.check_error("bind_geometry");
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: &Self::Buffer) {
        unsafe { self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer.buffer)) };
        self.check_error("bind_uniform_buffer");
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.gl.draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_SHORT, 0);
        }
        self.check_error("draw_indexed");
    }
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        if let Some(vertex_array) = self.vertex_array.take() {
            unsafe {
                self.gl.bind_vertex_array(None);
                self.gl.delete_vertex_array(vertex_array);
            }
        }
    }
}
