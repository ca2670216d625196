use std::num::NonZeroU32;
use std::sync::Arc;
use color_eyre::Result;
use color_eyre::eyre::{OptionExt, eyre};
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi as GlutinApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext,
    PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::window::Window;
use crate::renderer::Renderer;
use crate::renderer::config::RenderConfig;
use crate::renderer::context::{Context, ContextApi};
use crate::renderer::gl::GlRenderer;
use crate::renderer::gl::device::GlDevice;

const MAX_SAMPLES: u8 = 4;

/// OpenGL 3.3 core context bound to one window
pub struct GlContext {
    config: RenderConfig,
    // Field order matters for teardown, see `destroy`
    renderer: Option<GlRenderer>,
    gl_context: Option<PossiblyCurrentContext>,
    surface: Option<Surface<WindowSurface>>,
    window: Option<Arc<Window>>,
}

impl GlContext {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            renderer: None,
            gl_context: None,
            surface: None,
            window: None,
        }
    }

    fn display_preference(raw_window: RawWindowHandle) -> DisplayApiPreference {
        #[cfg(windows)]
        {
            DisplayApiPreference::Wgl(Some(raw_window))
        }
        #[cfg(target_os = "macos")]
        {
            let _ = raw_window;
            DisplayApiPreference::Cgl
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let _ = raw_window;
            DisplayApiPreference::Egl
        }
    }

    fn select_config(display: &Display, raw_window: RawWindowHandle) -> Result<Config> {
        let template = ConfigTemplateBuilder::new()
            .with_depth_size(24)
            .with_stencil_size(8)
            .compatible_with_native_window(raw_window)
            .build();

        unsafe { display.find_configs(template)? }
            .filter(|config| config.num_samples() <= MAX_SAMPLES)
            .reduce(|best, config| {
                if config.num_samples() > best.num_samples() { config } else { best }
            })
            .ok_or_eyre("No suitable OpenGL framebuffer config found")
    }

    fn surface_size(&self) -> Result<(NonZeroU32, NonZeroU32)> {
        NonZeroU32::new(self.config.width)
            .zip(NonZeroU32::new(self.config.height))
            .ok_or_eyre("Cannot create a surface with a zero-sized dimension")
    }
}

impl Context for GlContext {
    fn api(&self) -> ContextApi {
        ContextApi::OpenGl
    }

    fn init(&mut self, window: Arc<Window>) -> Result<()> {
        if self.gl_context.is_some() {
            return Err(eyre!("OpenGL context is already initialized"));
        }

        let size = window.inner_size();
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
        }

        let raw_display = window.display_handle()?.as_raw();
        let raw_window = window.window_handle()?.as_raw();

        let display = unsafe { Display::new(raw_display, Self::display_preference(raw_window))? };
        let gl_config = Self::select_config(&display, raw_window)?;
        log::debug!("Selected GL config with {} samples", gl_config.num_samples());

        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(GlutinApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window));
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes)? };

        let (width, height) = self.surface_size()?;
        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new()
            .build(raw_window, width, height);
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes)? };
        let gl_context = not_current.make_current(&surface)?;

        let interval = if self.config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&gl_context, interval) {
            log::warn!("Failed to set swap interval: {e}");
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| display.get_proc_address(symbol).cast())
        };
        let mut renderer = GlRenderer::new(GlDevice::new(gl)?, self.config.clone());

        self.window = Some(window);
        self.surface = Some(surface);
        self.gl_context = Some(gl_context);

        if renderer.init_renderer().is_err() {
            log::warn!("OpenGL context is running without drawable resources");
        }
        self.renderer = Some(renderer);

        Ok(())
    }

    fn destroy(&mut self) {
        // GPU objects must go while the context is still current
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy_renderer();
        }
        self.gl_context = None;
        self.surface = None;
        self.window = None;
    }

    fn swap_buffers(&mut self) -> Result<()> {
        let (Some(surface), Some(gl_context)) = (self.surface.as_ref(), self.gl_context.as_ref()) else {
            return Err(eyre!("swap_buffers called on an uninitialized OpenGL context"));
        };
        surface.swap_buffers(gl_context)?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let (Some(width_nz), Some(height_nz)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            // Minimized
            return Ok(());
        };
        self.config.width = width;
        self.config.height = height;

        if let (Some(surface), Some(gl_context)) = (self.surface.as_ref(), self.gl_context.as_ref()) {
            surface.resize(gl_context, width_nz, height_nz);
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
        Ok(())
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        self.renderer
            .as_mut()
            .map(|renderer| renderer as &mut dyn Renderer)
    }
}

impl Drop for GlContext {
    fn drop(&mut self) {
        self.destroy();
    }
}
