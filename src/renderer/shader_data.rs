use std::mem::{offset_of, size_of};
use std::ops::Range;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Number of point lights baked into the shader sources. Changing it regenerates both the GLSL
/// and HLSL sources and the uniform block layout.
pub const LIGHT_COUNT: usize = 4;

/// Name of the uniform block in both shading languages
pub const MATRICES_BLOCK_NAME: &str = "matrices";

/// Binding point (GL) / constant buffer register (D3D) of the matrices block
pub const MATRICES_BINDING: u32 = 0;

/// One point light as laid out inside the uniform block (16-byte aligned vectors)
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    pub position: [f32; 3],
    _padding0: f32,
    pub color: [f32; 3],
    _padding1: f32,
}

impl PointLightData {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            _padding0: 0.0,
            color: color.to_array(),
            _padding1: 0.0,
        }
    }
}

/// Data uploaded into the `matrices` uniform block
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MatricesBlock {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub lights: [PointLightData; LIGHT_COUNT],
}

impl Default for MatricesBlock {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            lights: [PointLightData::default(); LIGHT_COUNT],
        }
    }
}

/// A field of [`MatricesBlock`] that can be uploaded on its own
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniformField {
    Model,
    View,
    Projection,
    Lights,
}

impl UniformField {
    /// Byte range of the field, taken from the declared struct layout
    pub fn byte_range(self) -> Range<usize> {
        let (offset, size) = match self {
            UniformField::Model => (offset_of!(MatricesBlock, model), size_of::<Mat4>()),
            UniformField::View => (offset_of!(MatricesBlock, view), size_of::<Mat4>()),
            UniformField::Projection => (offset_of!(MatricesBlock, projection), size_of::<Mat4>()),
            UniformField::Lights => (
                offset_of!(MatricesBlock, lights),
                size_of::<[PointLightData; LIGHT_COUNT]>(),
            ),
        };
        offset..offset + size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_matches_std140_layout() {
        assert_eq!(size_of::<PointLightData>(), 32);
        assert_eq!(offset_of!(PointLightData, color), 16);
        assert_eq!(size_of::<MatricesBlock>(), 3 * 64 + LIGHT_COUNT * 32);
        assert_eq!(size_of::<MatricesBlock>() % 16, 0);
    }

    #[test]
    fn field_ranges_are_contiguous_and_disjoint() {
        let fields = [
            UniformField::Model,
            UniformField::View,
            UniformField::Projection,
            UniformField::Lights,
        ];
        let mut expected_start = 0;
        for field in fields {
            let range = field.byte_range();
            assert_eq!(range.start, expected_start, "{field:?}");
            assert_eq!(range.start % 16, 0, "{field:?} is not 16-byte aligned");
            expected_start = range.end;
        }
        assert_eq!(expected_start, size_of::<MatricesBlock>());
    }

    #[test]
    fn matrix_fields_follow_declaration_order() {
        assert_eq!(UniformField::Model.byte_range(), 0..64);
        assert_eq!(UniformField::View.byte_range(), 64..128);
        assert_eq!(UniformField::Projection.byte_range(), 128..192);
    }
}
