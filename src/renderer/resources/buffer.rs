use std::mem::size_of;
use std::ops::Range;
use color_eyre::Result;
use glam::Mat4;
use crate::renderer::core::device::{BufferKind, GraphicsDevice};
use crate::renderer::shader_data::{LIGHT_COUNT, MatricesBlock, PointLightData, UniformField};

/// GPU uniform buffer for [`MatricesBlock`] with a CPU copy.
///
/// Setters only touch the CPU copy and widen the dirty range; [`UniformBuffer::flush`] uploads
/// the dirty range in one call. Offsets always come from [`UniformField::byte_range`].
pub struct UniformBuffer<D: GraphicsDevice> {
    pub buffer: D::Buffer,
    block: MatricesBlock,
    dirty: Option<Range<usize>>,
}

impl<D: GraphicsDevice> UniformBuffer<D> {
    pub fn new(device: &mut D) -> Result<Self> {
        let block = MatricesBlock::default();
        let buffer = device.create_buffer(BufferKind::Uniform, bytemuck::bytes_of(&block))?;
        Ok(Self {
            buffer,
            block,
            dirty: None,
        })
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.block.model = model;
        self.mark_dirty(UniformField::Model);
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.block.view = view;
        self.mark_dirty(UniformField::View);
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.block.projection = projection;
        self.mark_dirty(UniformField::Projection);
    }

    pub fn set_lights(&mut self, lights: [PointLightData; LIGHT_COUNT]) {
        self.block.lights = lights;
        self.mark_dirty(UniformField::Lights);
    }

    pub fn block(&self) -> &MatricesBlock {
        &self.block
    }

    /// Uploads pending changes. Returns false when there was nothing to upload.
    pub fn flush(&mut self, device: &mut D) -> bool {
        let Some(range) = self.dirty.take() else {
            return false;
        };
        let bytes = bytemuck::bytes_of(&self.block);
        device.update_buffer(&mut self.buffer, range.start, &bytes[range]);
        true
    }

    pub fn destroy(self, device: &mut D) {
        device.delete_buffer(self.buffer);
    }

    pub const fn size() -> usize {
        size_of::<MatricesBlock>()
    }

    fn mark_dirty(&mut self, field: UniformField) {
        let range = field.byte_range();
        self.dirty = Some(match self.dirty.take() {
            Some(dirty) => dirty.start.min(range.start)..dirty.end.max(range.end),
            None => range,
        });
    }
}
