/// Contains configuration options for the renderer like the resolution, vsync, and other settings
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Present once per display refresh when set, otherwise present immediately
    pub vsync: bool,
    pub clear_color: [f32; 4],
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Number of cubes along each side of the grid
    pub grid_size: u32,
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
            vsync: true,
            clear_color: [0.0, 1.0, 1.0, 0.5],
            fov_y_deg: 90.0,
            near: 0.02,
            far: 200.0,
            grid_size: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aspect_matches_window() {
        let config = RenderConfig::default();
        assert_eq!(config.aspect_ratio(), 1440.0 / 900.0);
    }

    #[test]
    fn zero_height_does_not_divide_by_zero() {
        let config = RenderConfig { height: 0, ..Default::default() };
        assert!(config.aspect_ratio().is_finite());
    }
}
