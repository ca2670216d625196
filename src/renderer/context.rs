use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use color_eyre::Result;
use winit::window::Window;
use crate::renderer::Renderer;
use crate::renderer::config::RenderConfig;
use crate::renderer::gl::context::GlContext;
#[cfg(windows)]
use crate::renderer::d3d11::context::D3D11Context;

/// Graphics API of a context. Backends that are not compiled for the target platform have no
/// variant at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextApi {
    OpenGl,
    #[cfg(windows)]
    Direct3D11,
}

impl ContextApi {
    pub const D3D11_FLAG: &'static str = "-d3d11";

    pub fn available() -> &'static [ContextApi] {
        &[
            ContextApi::OpenGl,
            #[cfg(windows)]
            ContextApi::Direct3D11,
        ]
    }

    /// OpenGL unless `-d3d11` is passed and Direct3D11 is compiled in
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut api = ContextApi::OpenGl;
        for arg in args {
            match arg.as_ref() {
                Self::D3D11_FLAG => {
                    #[cfg(windows)]
                    {
                        api = ContextApi::Direct3D11;
                    }
                    #[cfg(not(windows))]
                    log::warn!("Direct3D11 is not available on this platform, using OpenGL");
                }
                other => log::warn!("Ignoring unknown argument: {other}"),
            }
        }
        api
    }
}

impl fmt::Display for ContextApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextApi::OpenGl => write!(f, "OpenGL"),
            #[cfg(windows)]
            ContextApi::Direct3D11 => write!(f, "Direct3D11"),
        }
    }
}

/// Owns a device, its presentation surface and one [`Renderer`]
pub trait Context {
    fn api(&self) -> ContextApi;

    /// Creates the device against `window`, sets the viewport, primes backend state and builds
    /// the renderer. Device creation failures are returned; shader failures are logged and
    /// leave the renderer undrawable. Calling it twice is an error.
    fn init(&mut self, window: Arc<Window>) -> Result<()>;

    /// Releases the renderer and every device object. Tolerates a partial or missing `init`.
    fn destroy(&mut self);

    /// Presents the back buffer, blocking for one refresh when vsync is on
    fn swap_buffers(&mut self) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// `None` until `init` succeeded
    fn renderer(&mut self) -> Option<&mut dyn Renderer>;
}

/// Creates contexts and holds the single active one.
///
/// The active context is reachable only through the factory that owns it, and the factory is
/// neither `Send` nor `Sync`, so exactly one thread ever touches GPU state.
pub struct ContextFactory {
    current: Option<Box<dyn Context>>,
    _single_thread: PhantomData<*const ()>,
}

impl ContextFactory {
    pub fn new() -> Self {
        Self {
            current: None,
            _single_thread: PhantomData,
        }
    }

    pub fn create_context(api: ContextApi, config: RenderConfig) -> Box<dyn Context> {
        log::info!("Creating {api} context");
        match api {
            ContextApi::OpenGl => Box::new(GlContext::new(config)),
            #[cfg(windows)]
            ContextApi::Direct3D11 => Box::new(D3D11Context::new(config)),
        }
    }

    /// Destroys the context; ownership makes a second release impossible
    pub fn release_context(mut context: Box<dyn Context>) {
        log::info!("Releasing {} context", context.api());
        context.destroy();
    }

    /// Makes `context` the active one and hands back the previously active context, if any
    pub fn set_current_context(&mut self, context: Box<dyn Context>) -> Option<Box<dyn Context>> {
        self.current.replace(context)
    }

    pub fn current_context(&mut self) -> Option<&mut dyn Context> {
        self.current
            .as_mut()
            .map(|context| context.as_mut() as &mut dyn Context)
    }

    pub fn current_renderer(&mut self) -> Option<&mut dyn Renderer> {
        self.current_context()?.renderer()
    }

    pub fn release_current_context(&mut self) {
        if let Some(context) = self.current.take() {
            Self::release_context(context);
        }
    }
}

impl Default for ContextFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContextFactory {
    fn drop(&mut self) {
        self.release_current_context();
    }
}
