use glam::{Mat4, Vec3};

/// Clip-space depth convention of a backend
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DepthRange {
    /// OpenGL, depth maps to [-1, 1]
    NegativeOneToOne,
    /// Direct3D, depth maps to [0, 1]
    ZeroToOne,
}

pub fn calculate_pitch(forward: Vec3) -> f32 {
    let forward = forward.normalize();
    forward.y.clamp(-1.0, 1.0).asin()
}

pub fn calculate_yaw(forward: Vec3) -> f32 {
    let forward = forward.normalize();
    forward.z.atan2(forward.x)
}

pub fn calculate_direction(pitch: f32, yaw: f32) -> Vec3 {
    Vec3::new(
        yaw.cos() * pitch.cos(),
        pitch.sin(),
        yaw.sin() * pitch.cos(),
    )
}

pub fn perspective(
    fov_y_deg: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    depth_range: DepthRange,
) -> Mat4 {
    let fov_y = fov_y_deg.to_radians();
    match depth_range {
        DepthRange::NegativeOneToOne => Mat4::perspective_rh_gl(fov_y, aspect_ratio, near, far),
        DepthRange::ZeroToOne => Mat4::perspective_rh(fov_y, aspect_ratio, near, far),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_angles() {
        let dir = calculate_direction(0.3, -1.2);
        assert!((calculate_pitch(dir) - 0.3).abs() < 1e-5);
        assert!((calculate_yaw(dir) + 1.2).abs() < 1e-5);
    }

    #[test]
    fn default_yaw_looks_down_negative_z() {
        let dir = calculate_direction(0.0, (-90.0_f32).to_radians());
        assert!(dir.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn near_plane_depth_follows_convention() {
        let gl = perspective(90.0, 1.6, 0.02, 200.0, DepthRange::NegativeOneToOne);
        let d3d = perspective(90.0, 1.6, 0.02, 200.0, DepthRange::ZeroToOne);
        let near_point = glam::Vec4::new(0.0, 0.0, -0.02, 1.0);

        let gl_clip = gl * near_point;
        let d3d_clip = d3d * near_point;
        assert!((gl_clip.z / gl_clip.w + 1.0).abs() < 1e-4);
        assert!((d3d_clip.z / d3d_clip.w).abs() < 1e-4);
    }
}
