use glam::Vec3;
use crate::renderer::shader_data::{LIGHT_COUNT, PointLightData};

/// Point light with inverse-square falloff. `color` is unbounded so it doubles as intensity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }

    pub fn as_shader_data(&self) -> PointLightData {
        PointLightData::new(self.position, self.color)
    }
}

/// Lights hovering over the four quadrants of a grid with `grid_size` cells per side
pub fn default_lights(grid_size: u32) -> [PointLight; LIGHT_COUNT] {
    let quarter = grid_size as f32 / 4.0;
    let far = quarter * 3.0;
    [
        PointLight::new(Vec3::new(quarter, 3.0, quarter), Vec3::new(12.0, 12.0, 12.0)),
        PointLight::new(Vec3::new(far, 3.0, quarter), Vec3::new(14.0, 4.0, 4.0)),
        PointLight::new(Vec3::new(quarter, 3.0, far), Vec3::new(4.0, 14.0, 4.0)),
        PointLight::new(Vec3::new(far, 3.0, far), Vec3::new(4.0, 4.0, 14.0)),
    ]
}

pub fn lights_as_shader_data(lights: &[PointLight; LIGHT_COUNT]) -> [PointLightData; LIGHT_COUNT] {
    lights.map(|light| light.as_shader_data())
}
