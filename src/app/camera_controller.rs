use winit::keyboard::KeyCode;
use crate::app::input_state::{KeyboardEvent, MouseMovementEvent};
use crate::renderer::camera::{Camera, SharedCamera};

#[derive(Default)]
struct Movement {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

/// Free-fly WASD + mouse-look controller. Owns the camera the renderer observes.
pub struct CameraController {
    camera: SharedCamera,
    movement: Movement,

    mouse_sensitivity: f32,
    movement_speed: f32,
}

impl CameraController {
    /// Degrees per pixel of mouse motion
    pub const MOUSE_SENSITIVITY: f32 = 0.15;
    /// Units per second
    pub const MOVEMENT_SPEED: f32 = 7.5;

    pub fn new(camera: Camera) -> Self {
        Self {
            camera: camera.into_shared(),
            movement: Movement::default(),

            mouse_sensitivity: Self::MOUSE_SENSITIVITY,
            movement_speed: Self::MOVEMENT_SPEED,
        }
    }

    pub fn get_camera(&self) -> &SharedCamera {
        &self.camera
    }

    /// Latches WASD state; the camera only moves in [`CameraController::update`]
    pub fn process_keyboard(&mut self, event: &KeyboardEvent) {
        let pressed = event.is_pressed_down;
        match event.scan_code {
            KeyCode::KeyW => self.movement.forward = pressed,
            KeyCode::KeyS => self.movement.backward = pressed,
            KeyCode::KeyA => self.movement.left = pressed,
            KeyCode::KeyD => self.movement.right = pressed,
            _ => {}
        }
    }

    pub fn process_mouse_movement(&mut self, event: &MouseMovementEvent) {
        // Screen y grows downwards, pitch grows upwards
        let yaw = event.mouse_delta.x * self.mouse_sensitivity;
        let pitch = -event.mouse_delta.y * self.mouse_sensitivity;
        self.camera.borrow_mut().rotate(yaw, pitch);
    }

    pub fn update(&mut self, delta_time: f32) {
        let mut camera = self.camera.borrow_mut();
        let step = self.movement_speed * delta_time;
        let front = camera.get_front();
        let right = camera.get_right();

        if self.movement.forward {
            camera.translate(front * step);
        }
        if self.movement.backward {
            camera.translate(-front * step);
        }
        if self.movement.left {
            camera.translate(-right * step);
        }
        if self.movement.right {
            camera.translate(right * step);
        }
    }
}
