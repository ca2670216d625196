use std::cell::RefCell;
use std::rc::Rc;
use crate::renderer::util;
use glam::{Mat4, Vec3};

/// Camera shared between its owner (the controller) and the renderer, which only keeps a weak
/// reference to it
pub type SharedCamera = Rc<RefCell<Camera>>;

pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    yaw_deg: f32,
    pitch_deg: f32,
}

impl Camera {
    pub const MAX_PITCH_DEG: f32 = 89.999;

    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw_deg: -90.0,
            pitch_deg: 0.0,
        }
    }

    pub fn into_shared(self) -> SharedCamera {
        Rc::new(RefCell::new(self))
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Adds to yaw and pitch (in degrees) and recomputes the front vector
    pub fn rotate(&mut self, yaw_delta_deg: f32, pitch_delta_deg: f32) {
        self.yaw_deg += yaw_delta_deg;
        self.pitch_deg = (self.pitch_deg + pitch_delta_deg)
            .clamp(-Self::MAX_PITCH_DEG, Self::MAX_PITCH_DEG);

        self.front = util::calculate_direction(
            self.pitch_deg.to_radians(),
            self.yaw_deg.to_radians(),
        ).normalize();
    }

    /// Turns the camera towards `target`, keeping the pitch limit
    pub fn look_at(&mut self, target: Vec3) {
        let direction = target - self.position;
        if direction.length_squared() <= f32::EPSILON {
            return;
        }
        self.yaw_deg = util::calculate_yaw(direction).to_degrees();
        self.pitch_deg = 0.0;
        self.rotate(0.0, util::calculate_pitch(direction).to_degrees());
    }

    pub fn get_view_mat(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn get_position(&self) -> Vec3 {
        self.position
    }

    pub fn get_front(&self) -> Vec3 {
        self.front
    }

    pub fn get_up(&self) -> Vec3 {
        self.up
    }

    pub fn get_right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    pub fn get_yaw_pitch(&self) -> (f32, f32) {
        (self.yaw_deg, self.pitch_deg)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
