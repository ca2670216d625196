use std::rc::Weak;
use std::cell::RefCell;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use glam::Mat4;
use crate::renderer::Renderer;
use crate::renderer::camera::{Camera, SharedCamera};
use crate::renderer::config::RenderConfig;
use crate::renderer::core::device::GraphicsDevice;
use crate::renderer::core::state::RenderState;
use crate::renderer::resources::buffer::UniformBuffer;
use crate::renderer::resources::grid::GridInstances;
use crate::renderer::resources::light::{self, PointLight};
use crate::renderer::resources::mesh::GeometryBuffer;
use crate::renderer::resources::shader::{ShaderProgram, ShaderSources};
use crate::renderer::shader_data::{LIGHT_COUNT, MATRICES_BINDING};
use crate::renderer::util;

/// Draws the lit cube grid through any [`GraphicsDevice`]
pub struct CubeRenderer<D: GraphicsDevice> {
    device: D,
    config: RenderConfig,
    state: RenderState,

    program: Option<ShaderProgram<D>>,
    geometry: Option<GeometryBuffer<D>>,
    uniforms: Option<UniformBuffer<D>>,

    camera: Option<Weak<RefCell<Camera>>>,
    lights: [PointLight; LIGHT_COUNT],
}

impl<D: GraphicsDevice> CubeRenderer<D> {
    pub fn new(device: D, config: RenderConfig) -> Self {
        let lights = light::default_lights(config.grid_size);
        Self {
            device,
            config,
            state: RenderState::new(),
            program: None,
            geometry: None,
            uniforms: None,
            camera: None,
            lights,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn is_drawable(&self) -> bool {
        self.program.is_some() && self.geometry.is_some() && self.uniforms.is_some()
    }

    fn projection(&self) -> Mat4 {
        util::perspective(
            self.config.fov_y_deg,
            self.config.aspect_ratio(),
            self.config.near,
            self.config.far,
            D::DEPTH_RANGE,
        )
    }

    fn create_resources(&mut self) -> Result<()> {
        let sources = ShaderSources::lit_cube(D::LANGUAGE);
        self.program = Some(ShaderProgram::new(&mut self.device, &sources)?);
        self.geometry = Some(GeometryBuffer::new_cube(&mut self.device)?);
        self.uniforms = Some(UniformBuffer::new(&mut self.device)?);
        Ok(())
    }

    /// Per-frame uniforms (view, projection, lights) go up once per frame, however many render
    /// calls share it, then only the model matrix changes between draws.
    fn draw_instances<I>(&mut self, operation: &str, instances: I) -> Result<()>
    where
        I: IntoIterator<Item = Mat4>,
    {
        self.state.expect_drawing(operation)?;

        if !self.is_drawable() {
            if !self.state.undrawable_reported {
                log::warn!("Skipping {operation}: renderer resources were not initialized");
                self.state.undrawable_reported = true;
            }
            return Ok(());
        }

        let Some(camera) = self.camera.as_ref().and_then(Weak::upgrade) else {
            return Ok(());
        };
        let view = camera
            .try_borrow()
            .map_err(|e| eyre!("Active camera is mutably borrowed: {e}"))?
            .get_view_mat();
        let projection = self.projection();

        let (Some(program), Some(geometry), Some(uniforms)) = (
            self.program.as_ref(),
            self.geometry.as_ref(),
            self.uniforms.as_mut(),
        ) else {
            return Ok(());
        };

        self.device.use_program(&program.program);
        self.device.bind_geometry(
            &geometry.vertices,
            &geometry.indices,
            program.bindings.position_location,
            geometry.vertex_stride,
        );
        self.device.bind_uniform_buffer(MATRICES_BINDING, &uniforms.buffer);

        if !self.state.frame_uniforms_written {
            uniforms.set_view(view);
            uniforms.set_projection(projection);
            uniforms.set_lights(light::lights_as_shader_data(&self.lights));
            uniforms.flush(&mut self.device);
            self.state.frame_uniforms_written = true;
        }

        for model in instances {
            uniforms.set_model(model);
            uniforms.flush(&mut self.device);
            self.device.draw_indexed(geometry.index_count);
        }

        Ok(())
    }
}

impl<D: GraphicsDevice> Renderer for CubeRenderer<D> {
    fn init_renderer(&mut self) -> Result<()> {
        if self.state.init_attempted {
            return Err(eyre!("init_renderer called twice"));
        }
        self.state.init_attempted = true;

        self.device.apply_default_state();
        self.device.set_viewport(self.config.width, self.config.height);

        if let Err(e) = self.create_resources() {
            log::error!("Renderer initialization failed, nothing will be drawn: {e}");
            return Err(e);
        }

        log::info!("Renderer initialized");
        Ok(())
    }

    fn destroy_renderer(&mut self) {
        if let Some(program) = self.program.take() {
            program.destroy(&mut self.device);
        }
        if let Some(geometry) = self.geometry.take() {
            geometry.destroy(&mut self.device);
        }
        if let Some(uniforms) = self.uniforms.take() {
            uniforms.destroy(&mut self.device);
        }
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.state.begin_frame()?;
        self.device.clear(self.config.clear_color);
        Ok(())
    }

    fn render_chunks(&mut self) -> Result<()> {
        self.state.expect_drawing("render_chunks")
    }

    fn render_single_cube(&mut self) -> Result<()> {
        self.draw_instances("render_single_cube", [Mat4::IDENTITY])
    }

    fn render_cube_grid(&mut self) -> Result<()> {
        let grid = GridInstances::new(self.config.grid_size);
        self.draw_instances("render_cube_grid", grid)
    }

    fn end_frame(&mut self) -> Result<()> {
        self.state.end_frame()
    }

    fn set_active_scene_camera(&mut self, camera: Option<&SharedCamera>) {
        self.camera = camera.map(SharedCamera::downgrade);
    }

    fn set_point_lights(&mut self, lights: [PointLight; LIGHT_COUNT]) {
        self.lights = lights;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.device.set_viewport(width, height);
    }
}

impl<D: GraphicsDevice> Drop for CubeRenderer<D> {
    fn drop(&mut self) {
        self.destroy_renderer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use crate::renderer::camera::Camera;
    use crate::renderer::core::device::StageKind;
    use crate::renderer::core::recording::{Command, RecordingDevice};
    use crate::renderer::shader_data::{MatricesBlock, UniformField};

    fn renderer_with(device: RecordingDevice) -> CubeRenderer<RecordingDevice> {
        CubeRenderer::new(device, RenderConfig::default())
    }

    fn ready_renderer() -> (CubeRenderer<RecordingDevice>, SharedCamera) {
        let mut renderer = renderer_with(RecordingDevice::new());
        renderer.init_renderer().unwrap();
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(3.0, 3.0, -3.0));
        let camera = camera.into_shared();
        renderer.set_active_scene_camera(Some(&camera));
        renderer.device_mut().commands.clear();
        (renderer, camera)
    }

    fn model_from_upload(offset: usize, data: &[u8]) -> Option<Mat4> {
        (offset == UniformField::Model.byte_range().start && data.len() == 64)
            .then(|| bytemuck::pod_read_unaligned::<Mat4>(data))
    }

    #[test]
    fn grid_uploads_one_model_per_cell_in_row_major_order() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let device = renderer.device();
        let models: Vec<Mat4> = device
            .uploads()
            .into_iter()
            .filter_map(|(offset, data)| model_from_upload(offset, data))
            .collect();
        let expected: Vec<Mat4> = (0..16)
            .flat_map(|x| (0..16).map(move |z| Mat4::from_translation(Vec3::new(x as f32, 0.0, z as f32))))
            .collect();
        assert_eq!(models, expected);
        assert_eq!(device.draw_count(), 256);
        assert!(device.commands.iter().all(|c| !matches!(c, Command::DrawIndexed(n) if *n != 36)));
    }

    #[test]
    fn frame_uniforms_upload_once_per_frame() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let uploads = renderer.device().uploads();
        assert_eq!(uploads.len(), 256 + 1);

        let view_start = UniformField::View.byte_range().start;
        let frame_uploads: Vec<_> = uploads.iter().filter(|(offset, _)| *offset == view_start).collect();
        assert_eq!(frame_uploads.len(), 1);
        assert_eq!(frame_uploads[0].0 + frame_uploads[0].1.len(), size_of::<MatricesBlock>());
    }

    #[test]
    fn frame_uniforms_upload_once_across_render_calls() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.begin_frame().unwrap();
        renderer.render_single_cube().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let view_start = UniformField::View.byte_range().start;
        let uploads = renderer.device().uploads();
        assert_eq!(uploads.iter().filter(|(offset, _)| *offset == view_start).count(), 1);
        assert_eq!(uploads.len(), 1 + 1 + 256);
        assert_eq!(renderer.device().draw_count(), 257);

        // The next frame writes them again
        renderer.device_mut().commands.clear();
        renderer.begin_frame().unwrap();
        renderer.render_single_cube().unwrap();
        renderer.end_frame().unwrap();
        let uploads = renderer.device().uploads();
        assert_eq!(uploads.iter().filter(|(offset, _)| *offset == view_start).count(), 1);
    }

    #[test]
    fn replaced_lights_are_uploaded_before_the_first_draw() {
        let (mut renderer, _camera) = ready_renderer();
        let lights = [
            PointLight::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0)),
            PointLight::new(Vec3::new(4.0, 5.0, 6.0), Vec3::new(0.0, 1.0, 0.0)),
            PointLight::new(Vec3::new(7.0, 8.0, 9.0), Vec3::new(0.0, 0.0, 1.0)),
            PointLight::new(Vec3::new(-1.0, 10.0, -1.0), Vec3::splat(20.0)),
        ];
        renderer.set_point_lights(lights);

        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let device = renderer.device();
        let lights_range = UniformField::Lights.byte_range();
        let contents = device.buffer_contents(device.uniform_buffer_id());
        let expected = light::lights_as_shader_data(&lights);
        assert_eq!(&contents[lights_range.clone()], bytemuck::bytes_of(&expected));

        let light_writes: Vec<usize> = device.commands
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                Command::UpdateBuffer { offset, data, .. }
                    if *offset <= lights_range.start && offset + data.len() >= lights_range.end => Some(i),
                _ => None,
            })
            .collect();
        let first_draw = device.commands
            .iter()
            .position(|c| matches!(c, Command::DrawIndexed(_)))
            .unwrap();
        assert_eq!(light_writes.len(), 1);
        assert!(light_writes[0] < first_draw);
    }

    #[test]
    fn every_draw_follows_its_model_upload() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let commands = &renderer.device().commands;
        for (i, command) in commands.iter().enumerate() {
            if let Command::DrawIndexed(_) = command {
                assert!(matches!(&commands[i - 1], Command::UpdateBuffer { offset: 0, .. }));
            }
        }
    }

    #[test]
    fn uploaded_view_and_projection_come_from_camera_and_config() {
        let (mut renderer, camera) = ready_renderer();
        renderer.begin_frame().unwrap();
        renderer.render_single_cube().unwrap();
        renderer.end_frame().unwrap();

        let device = renderer.device();
        let block: MatricesBlock = bytemuck::pod_read_unaligned(device.buffer_contents(device.uniform_buffer_id()));
        let expected_view = Mat4::look_at_rh(
            Vec3::new(3.0, 3.0, -3.0),
            Vec3::new(3.0, 3.0, -3.0) + camera.borrow().get_front(),
            Vec3::Y,
        );
        let expected_projection = Mat4::perspective_rh_gl(90.0_f32.to_radians(), 1440.0 / 900.0, 0.02, 200.0);
        assert!(block.view.abs_diff_eq(expected_view, 1e-6));
        assert!(block.projection.abs_diff_eq(expected_projection, 1e-6));
        assert_eq!(block.model, Mat4::IDENTITY);
        assert_eq!(block.lights[0].position, renderer.lights[0].position.to_array());
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn no_camera_means_no_draws_and_no_uploads() {
        let mut renderer = renderer_with(RecordingDevice::new());
        renderer.init_renderer().unwrap();
        renderer.device_mut().commands.clear();

        renderer.begin_frame().unwrap();
        renderer.render_single_cube().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();

        let device = renderer.device();
        assert_eq!(device.draw_count(), 0);
        assert!(device.uploads().is_empty());
        assert_eq!(device.commands, vec![Command::Clear(RenderConfig::default().clear_color)]);
    }

    #[test]
    fn dropped_camera_is_treated_as_absent() {
        let (mut renderer, camera) = ready_renderer();
        drop(camera);
        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();
        assert_eq!(renderer.device().draw_count(), 0);
    }

    #[test]
    fn destroy_after_failed_init_releases_everything_once() {
        let mut renderer = renderer_with(RecordingDevice::failing_stage(StageKind::Fragment));
        assert!(renderer.init_renderer().is_err());
        assert!(!renderer.is_drawable());

        renderer.destroy_renderer();
        renderer.destroy_renderer();
        assert_eq!(renderer.device().live_handles(), 0);
    }

    #[test]
    fn failed_init_makes_draws_no_ops() {
        let mut renderer = renderer_with(RecordingDevice::failing_link());
        assert!(renderer.init_renderer().is_err());
        let camera = Camera::new().into_shared();
        renderer.set_active_scene_camera(Some(&camera));

        renderer.begin_frame().unwrap();
        renderer.render_cube_grid().unwrap();
        renderer.end_frame().unwrap();
        assert_eq!(renderer.device().draw_count(), 0);
        assert!(renderer.device().uploads().is_empty());
    }

    #[test]
    fn destroy_releases_all_handles() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.destroy_renderer();
        assert_eq!(renderer.device().live_handles(), 0);
    }

    #[test]
    fn frame_protocol_violations_are_errors() {
        let (mut renderer, _camera) = ready_renderer();
        assert!(renderer.render_cube_grid().is_err());
        assert!(renderer.end_frame().is_err());
        renderer.begin_frame().unwrap();
        assert!(renderer.begin_frame().is_err());
        renderer.render_chunks().unwrap();
        renderer.end_frame().unwrap();
        assert_eq!(renderer.device().draw_count(), 0);
    }

    #[test]
    fn init_twice_is_rejected() {
        let mut renderer = renderer_with(RecordingDevice::new());
        renderer.init_renderer().unwrap();
        assert!(renderer.init_renderer().is_err());
    }

    #[test]
    fn resize_updates_viewport_and_aspect() {
        let (mut renderer, _camera) = ready_renderer();
        renderer.resize(800, 800);
        assert_eq!(renderer.device().commands, vec![Command::SetViewport(800, 800)]);

        renderer.begin_frame().unwrap();
        renderer.render_single_cube().unwrap();
        renderer.end_frame().unwrap();
        let device = renderer.device();
        let block: MatricesBlock = bytemuck::pod_read_unaligned(device.buffer_contents(device.uniform_buffer_id()));
        let expected = Mat4::perspective_rh_gl(90.0_f32.to_radians(), 1.0, 0.02, 200.0);
        assert!(block.projection.abs_diff_eq(expected, 1e-6));
    }
}
