use std::ffi::c_void;
use std::sync::Arc;
use color_eyre::Result;
use color_eyre::eyre::{OptionExt, eyre};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::{HMODULE, HWND};
use windows::Win32::Graphics::Direct3D::{D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL_11_0};
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CREATE_DEVICE_FLAG, D3D11_SDK_VERSION, D3D11CreateDeviceAndSwapChain,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_UNKNOWN, DXGI_MODE_DESC, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    DXGI_PRESENT, DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_EFFECT_FLIP_DISCARD,
    DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGISwapChain,
};
use winit::window::Window;
use crate::renderer::Renderer;
use crate::renderer::config::RenderConfig;
use crate::renderer::context::{Context, ContextApi};
use crate::renderer::d3d11::D3D11Renderer;
use crate::renderer::d3d11::device::D3D11Device;

const SWAP_CHAIN_BUFFERS: u32 = 2;

/// Direct3D 11 device and flip-model swap chain bound to one window
pub struct D3D11Context {
    config: RenderConfig,
    renderer: Option<D3D11Renderer>,
    swap_chain: Option<IDXGISwapChain>,
    window: Option<Arc<Window>>,
}

impl D3D11Context {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            renderer: None,
            swap_chain: None,
            window: None,
        }
    }

    fn hwnd(window: &Window) -> Result<HWND> {
        match window.window_handle()?.as_raw() {
            RawWindowHandle::Win32(handle) => Ok(HWND(handle.hwnd.get() as *mut c_void)),
            other => Err(eyre!("Direct3D11 needs a Win32 window, got {other:?}")),
        }
    }
}

impl Context for D3D11Context {
    fn api(&self) -> ContextApi {
        ContextApi::Direct3D11
    }

    fn init(&mut self, window: Arc<Window>) -> Result<()> {
        if self.swap_chain.is_some() {
            return Err(eyre!("Direct3D11 context is already initialized"));
        }

        let size = window.inner_size();
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
        }

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: self.config.width,
                Height: self.config.height,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: SWAP_CHAIN_BUFFERS,
            OutputWindow: Self::hwnd(&window)?,
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            Flags: 0,
        };

        let mut swap_chain = None;
        let mut device = None;
        let mut device_context = None;
        unsafe {
            D3D11CreateDeviceAndSwapChain(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_FLAG(0),
                Some(&[D3D_FEATURE_LEVEL_11_0]),
                D3D11_SDK_VERSION,
                Some(&swap_chain_desc),
                Some(&mut swap_chain),
                Some(&mut device),
                None,
                Some(&mut device_context),
            )?;
        }
        let swap_chain = swap_chain.ok_or_eyre("D3D11CreateDeviceAndSwapChain returned no swap chain")?;
        let device = device.ok_or_eyre("D3D11CreateDeviceAndSwapChain returned no device")?;
        let device_context = device_context.ok_or_eyre("D3D11CreateDeviceAndSwapChain returned no context")?;
        log::info!("Direct3D11 device created at feature level 11.0");

        let mut d3d_device = D3D11Device::new(device, device_context);
        d3d_device.create_targets(&swap_chain, self.config.width, self.config.height)?;
        let mut renderer = D3D11Renderer::new(d3d_device, self.config.clone());

        self.window = Some(window);
        self.swap_chain = Some(swap_chain);

        if renderer.init_renderer().is_err() {
            log::warn!("Direct3D11 context is running without drawable resources");
        }
        self.renderer = Some(renderer);

        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy_renderer();
            renderer.device_mut().release_targets();
        }
        self.swap_chain = None;
        self.window = None;
    }

    fn swap_buffers(&mut self) -> Result<()> {
        let swap_chain = self.swap_chain
            .as_ref()
            .ok_or_eyre("swap_buffers called on an uninitialized Direct3D11 context")?;
        let interval = if self.config.vsync { 1 } else { 0 };
        unsafe { swap_chain.Present(interval, DXGI_PRESENT(0)) }.ok()?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;

        let (Some(swap_chain), Some(renderer)) = (self.swap_chain.as_ref(), self.renderer.as_mut()) else {
            return Ok(());
        };
        renderer.device_mut().release_targets();
        unsafe {
            swap_chain.ResizeBuffers(
                SWAP_CHAIN_BUFFERS,
                width,
                height,
                DXGI_FORMAT_UNKNOWN,
                DXGI_SWAP_CHAIN_FLAG(0),
            )?;
        }
        renderer.device_mut().create_targets(swap_chain, width, height)?;
        renderer.resize(width, height);
        Ok(())
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        self.renderer
            .as_mut()
            .map(|renderer| renderer as &mut dyn Renderer)
    }
}

impl Drop for D3D11Context {
    fn drop(&mut self) {
        self.destroy();
    }
}
