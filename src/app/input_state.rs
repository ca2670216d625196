use glam::Vec2;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A physical key going down or up. Repeats never produce one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyboardEvent {
    pub scan_code: KeyCode,
    pub is_pressed_down: bool,
    pub frame_delta: f32,
}

/// Relative mouse motion, only reported while the cursor is locked
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseMovementEvent {
    pub mouse_delta: Vec2,
    pub mouse_position: Vec2,
    pub frame_delta: f32,
}

#[derive(Default)]
pub struct InputState {
    pub cursor_locked: bool,
    pub mouse_curr_pos: Vec2,
}

impl InputState {
    /// Tracks the cursor and turns key input into a [`KeyboardEvent`]
    pub fn process_window_events(&mut self, event: &WindowEvent, frame_delta: f32) -> Option<KeyboardEvent> {
        match event {
            WindowEvent::CursorMoved {
                position,
                ..
            } => {
                self.mouse_curr_pos = Vec2::new(position.x as f32, position.y as f32);
                None
            }
            WindowEvent::KeyboardInput {
                event:
                KeyEvent {
                    physical_key,
                    state,
                    repeat,
                    ..
                },
                ..
            } => Self::keyboard_event(*physical_key, *state, *repeat, frame_delta),
            _ => None,
        }
    }

    pub fn keyboard_event(
        physical_key: PhysicalKey,
        state: ElementState,
        repeat: bool,
        frame_delta: f32,
    ) -> Option<KeyboardEvent> {
        let PhysicalKey::Code(scan_code) = physical_key else {
            return None;
        };
        if repeat {
            return None;
        }
        Some(KeyboardEvent {
            scan_code,
            is_pressed_down: state.is_pressed(),
            frame_delta,
        })
    }

    /// Raw device motion, dropped unless the cursor is locked to the window
    pub fn mouse_motion(&mut self, delta: (f64, f64), frame_delta: f32) -> Option<MouseMovementEvent> {
        if !self.cursor_locked {
            return None;
        }
        Some(MouseMovementEvent {
            mouse_delta: Vec2::new(delta.0 as f32, delta.1 as f32),
            mouse_position: self.mouse_curr_pos,
            frame_delta,
        })
    }
}
