use std::collections::{HashMap, HashSet};
use color_eyre::Result;
use crate::renderer::core::device::{BufferKind, GraphicsDevice, ShaderLanguage, StageKind};
use crate::renderer::util::DepthRange;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ApplyDefaultState,
    SetViewport(u32, u32),
    Clear([f32; 4]),
    CreateStage(u32, StageKind),
    DeleteStage(u32),
    CreateProgram(u32),
    AttachStage { program: u32, stage: u32 },
    LinkProgram(u32),
    DetachStage { program: u32, stage: u32 },
    DeleteProgram(u32),
    BindUniformBlock { program: u32, block_index: u32, binding: u32 },
    CreateBuffer(u32, BufferKind),
    UpdateBuffer { buffer: u32, offset: usize, data: Vec<u8> },
    DeleteBuffer(u32),
    UseProgram(u32),
    BindGeometry { vertices: u32, indices: u32, position_location: u32 },
    BindUniformBuffer { binding: u32, buffer: u32 },
    DrawIndexed(u32),
}

#[derive(Debug)]
pub struct RecordedStage {
    id: u32,
    compiled: bool,
}

#[derive(Debug)]
pub struct RecordedProgram {
    id: u32,
    attached: Vec<u32>,
    linked: bool,
}

#[derive(Debug)]
pub struct RecordedBuffer {
    id: u32,
}

/// Device that executes nothing and records every command, keeping buffer contents so they
/// can be read back. Deleting a handle twice panics.
#[derive(Default)]
pub struct RecordingDevice {
    pub commands: Vec<Command>,
    pub fail_stage: Option<StageKind>,
    pub fail_link: bool,
    buffers: HashMap<u32, Vec<u8>>,
    kinds: HashMap<u32, BufferKind>,
    live: HashSet<u32>,
    next_id: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_stage(kind: StageKind) -> Self {
        Self {
            fail_stage: Some(kind),
            ..Self::default()
        }
    }

    pub fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn buffer_contents(&self, id: u32) -> &[u8] {
        &self.buffers[&id]
    }

    /// Id of the only live uniform buffer. Independent of the command log, which tests clear.
    pub fn uniform_buffer_id(&self) -> u32 {
        let ids: Vec<u32> = self.kinds
            .iter()
            .filter(|(id, kind)| **kind == BufferKind::Uniform && self.live.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(ids.len(), 1, "expected exactly one uniform buffer");
        ids[0]
    }

    pub fn uploads(&self) -> Vec<(usize, &[u8])> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::UpdateBuffer { offset, data, .. } => Some((*offset, data.as_slice())),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed(_)))
            .count()
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.live.insert(self.next_id);
        self.next_id
    }

    fn free(&mut self, id: u32) {
        assert!(self.live.remove(&id), "handle {id} deleted twice or never created");
    }
}

impl GraphicsDevice for RecordingDevice {
    type Stage = RecordedStage;
    type Program = RecordedProgram;
    type Buffer = RecordedBuffer;

    const LANGUAGE: ShaderLanguage = ShaderLanguage::Glsl330;
    const DEPTH_RANGE: DepthRange = DepthRange::NegativeOneToOne;

    fn apply_default_state(&mut self) {
        self.commands.push(Command::ApplyDefaultState);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::SetViewport(width, height));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(Command::Clear(color));
    }

    fn create_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage> {
        let id = self.alloc();
        self.commands.push(Command::CreateStage(id, kind));
        Ok(RecordedStage {
            id,
            compiled: self.fail_stage != Some(kind) && !source.is_empty(),
        })
    }

    fn stage_compiled(&self, stage: &Self::Stage) -> bool {
        stage.compiled
    }

    fn stage_info_log(&self, stage: &Self::Stage) -> String {
        format!("0:1(1): error: forced failure in stage {}", stage.id)
    }

    fn delete_stage(&mut self, stage: Self::Stage) {
        self.free(stage.id);
        self.commands.push(Command::DeleteStage(stage.id));
    }

    fn create_program(&mut self) -> Result<Self::Program> {
        let id = self.alloc();
        self.commands.push(Command::CreateProgram(id));
        Ok(RecordedProgram { id, attached: Vec::new(), linked: false })
    }

    fn attach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        program.attached.push(stage.id);
        self.commands.push(Command::AttachStage { program: program.id, stage: stage.id });
    }

    fn link_program(&mut self, program: &mut Self::Program) {
        program.linked = !self.fail_link && program.attached.len() == 2;
        self.commands.push(Command::LinkProgram(program.id));
    }

    fn program_linked(&self, program: &Self::Program) -> bool {
        program.linked
    }

    fn program_info_log(&self, program: &Self::Program) -> String {
        format!("error: forced link failure in program {}", program.id)
    }

    fn detach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        program.attached.retain(|id| *id != stage.id);
        self.commands.push(Command::DetachStage { program: program.id, stage: stage.id });
    }

    fn delete_program(&mut self, program: Self::Program) {
        self.free(program.id);
        self.commands.push(Command::DeleteProgram(program.id));
    }

    fn uniform_block_index(&mut self, _program: &Self::Program, name: &str) -> Option<u32> {
        (name == "matrices").then_some(0)
    }

    fn bind_uniform_block(&mut self, program: &Self::Program, block_index: u32, binding: u32) {
        self.commands.push(Command::BindUniformBlock {
            program: program.id,
            block_index,
            binding,
        });
    }

    fn attribute_location(&mut self, _program: &Self::Program, name: &str) -> Option<u32> {
        (name == "position").then_some(0)
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<Self::Buffer> {
        let id = self.alloc();
        self.buffers.insert(id, data.to_vec());
        self.kinds.insert(id, kind);
        self.commands.push(Command::CreateBuffer(id, kind));
        Ok(RecordedBuffer { id })
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, offset: usize, data: &[u8]) {
        let contents = self.buffers.get_mut(&buffer.id).expect("unknown buffer");
        contents[offset..offset + data.len()].copy_from_slice(data);
        self.commands.push(Command::UpdateBuffer {
            buffer: buffer.id,
            offset,
            data: data.to_vec(),
        });
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        self.free(buffer.id);
        self.commands.push(Command::DeleteBuffer(buffer.id));
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.commands.push(Command::UseProgram(program.id));
    }

    fn bind_geometry(
        &mut self,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
        position_location: u32,
        _vertex_stride: u32,
    ) {
        self.commands.push(Command::BindGeometry {
            vertices: vertices.id,
            indices: indices.id,
            position_location,
        });
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: &Self::Buffer) {
        self.commands.push(Command::BindUniformBuffer { binding, buffer: buffer.id });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(Command::DrawIndexed(index_count));
    }
}
