mod input_state;
mod camera_controller;

use color_eyre::{Report, Result};
use glam::Vec3;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window, WindowId};
use crate::app::camera_controller::CameraController;
use crate::app::input_state::{InputState, KeyboardEvent};
use crate::renderer::camera::Camera;
use crate::renderer::config::RenderConfig;
use crate::renderer::{ContextApi, ContextFactory};

const WINDOW_TITLE: &str = "Test";

pub struct App {
    api: ContextApi,
    config: RenderConfig,
    // Contexts must be released before the window they render into
    contexts: ContextFactory,
    window: Option<Arc<Window>>,
    camera_controller: CameraController,

    // State
    input_state: InputState,
    prev_frame_time: Instant,
    delta_time_secs: f32,
    error: Option<Report>,
}

impl App {
    pub fn new(api: ContextApi, config: RenderConfig) -> Self {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(3.0, 3.0, -3.0));
        let grid_center = (config.grid_size as f32 - 1.0) / 2.0;
        camera.look_at(Vec3::new(grid_center, 0.0, grid_center));

        Self {
            api,
            config,
            contexts: ContextFactory::new(),
            window: None,
            camera_controller: CameraController::new(camera),

            input_state: InputState::default(),
            prev_frame_time: Instant::now(),
            delta_time_secs: 0.0,
            error: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_context(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let mut context = ContextFactory::create_context(self.api, self.config.clone());
        if let Err(e) = context.init(window.clone()) {
            ContextFactory::release_context(context);
            return Err(e);
        }
        if let Some(renderer) = context.renderer() {
            renderer.set_active_scene_camera(Some(self.camera_controller.get_camera()));
        }

        if let Some(previous) = self.contexts.set_current_context(context) {
            ContextFactory::release_context(previous);
        }
        self.window = Some(window);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        self.camera_controller.update(self.delta_time_secs);

        let Some(context) = self.contexts.current_context() else {
            return Ok(());
        };
        if let Some(renderer) = context.renderer() {
            renderer.begin_frame()?;
            renderer.render_chunks()?;
            renderer.render_cube_grid()?;
            renderer.end_frame()?;
        }
        context.swap_buffers()
    }

    fn process_keyboard(&mut self, event: KeyboardEvent) {
        if event.is_pressed_down && event.scan_code == KeyCode::Escape {
            self.toggle_cursor_lock();
        }
        self.camera_controller.process_keyboard(&event);
    }

    fn toggle_cursor_lock(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let lock = !self.input_state.cursor_locked;

        let result = if lock {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            log::error!("Failed to change cursor grab: {e}");
            return;
        }

        window.set_cursor_visible(!lock);
        self.input_state.cursor_locked = lock;
        log::debug!("cursor_locked: {lock}");
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Report) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: StartCause) {
        let curr_frame_time = Instant::now();
        self.delta_time_secs = curr_frame_time.duration_since(self.prev_frame_time).as_secs_f32();
        self.prev_frame_time = curr_frame_time;
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_context(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent
    ) {
        if self.window.as_ref().map(|window| window.id()) != Some(window_id) {
            return;
        }

        if let Some(keyboard_event) = self.input_state.process_window_events(&event, self.delta_time_secs) {
            self.process_keyboard(keyboard_event);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let result = match self.contexts.current_context() {
                    Some(context) => context.resize(size.width, size.height),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw_frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if let Some(movement) = self.input_state.mouse_motion(delta, self.delta_time_secs) {
                self.camera_controller.process_mouse_movement(&movement);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.contexts.release_current_context();
    }
}
