use std::ffi::{CString, c_void};
use color_eyre::Result;
use color_eyre::eyre::{OptionExt, eyre};
use windows::core::{Interface, PCSTR, s};
use windows::Win32::Graphics::Direct3D::{D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST, D3D_SIT_CBUFFER, ID3DBlob};
use windows::Win32::Graphics::Direct3D::Fxc::{D3DCOMPILE_ENABLE_STRICTNESS, D3DCompile, D3DReflect};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_FORMAT_D24_UNORM_S8_UINT, DXGI_FORMAT_R16_UINT, DXGI_FORMAT_R32G32B32_FLOAT, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::IDXGISwapChain;
use crate::renderer::core::device::{BufferKind, GraphicsDevice, ShaderLanguage, StageKind};
use crate::renderer::resources::shader::{HLSL_PIXEL_ENTRY, HLSL_VERTEX_ENTRY};
use crate::renderer::util::DepthRange;

/// Input layout slots, indexed by attribute location
const INPUT_SEMANTICS: [&str; 1] = ["POSITION"];

pub struct D3D11Stage {
    kind: StageKind,
    bytecode: Vec<u8>,
    errors: String,
    vertex_shader: Option<ID3D11VertexShader>,
    pixel_shader: Option<ID3D11PixelShader>,
}

#[derive(Default)]
pub struct D3D11Program {
    vertex_shader: Option<ID3D11VertexShader>,
    pixel_shader: Option<ID3D11PixelShader>,
    // Only needed until the input layout and reflection data exist
    vertex_bytecode: Option<Vec<u8>>,
    input_layout: Option<ID3D11InputLayout>,
    constant_buffers: Vec<(String, u32)>,
    linked: bool,
    info_log: String,
}

/// Buffers keep a CPU copy so partial writes to constant buffers can be turned into the
/// whole-buffer update feature level 11.0 requires.
pub struct D3D11Buffer {
    buffer: ID3D11Buffer,
    kind: BufferKind,
    shadow: Vec<u8>,
}

pub struct D3D11Device {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    render_target: Option<ID3D11RenderTargetView>,
    depth_stencil: Option<ID3D11DepthStencilView>,
    rasterizer_state: Option<ID3D11RasterizerState>,
    depth_state: Option<ID3D11DepthStencilState>,
}

impl D3D11Device {
    pub fn new(device: ID3D11Device, context: ID3D11DeviceContext) -> Self {
        Self {
            device,
            context,
            render_target: None,
            depth_stencil: None,
            rasterizer_state: None,
            depth_state: None,
        }
    }

    /// (Re)creates the back buffer view and a matching depth-stencil buffer
    pub fn create_targets(&mut self, swap_chain: &IDXGISwapChain, width: u32, height: u32) -> Result<()> {
        self.release_targets();

        let back_buffer: ID3D11Texture2D = unsafe { swap_chain.GetBuffer(0)? };
        let mut render_target = None;
        unsafe { self.device.CreateRenderTargetView(&back_buffer, None, Some(&mut render_target))? };

        let depth_desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_D24_UNORM_S8_UINT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let mut depth_buffer = None;
        unsafe { self.device.CreateTexture2D(&depth_desc, None, Some(&mut depth_buffer))? };
        let depth_buffer = depth_buffer.ok_or_eyre("Depth buffer creation returned nothing")?;

        let mut depth_stencil = None;
        unsafe { self.device.CreateDepthStencilView(&depth_buffer, None, Some(&mut depth_stencil))? };

        self.render_target = render_target;
        self.depth_stencil = depth_stencil;
        Ok(())
    }

    /// Drops every reference to the swap chain buffers so they can be resized
    pub fn release_targets(&mut self) {
        unsafe { self.context.OMSetRenderTargets(None, None) };
        self.render_target = None;
        self.depth_stencil = None;
    }

    fn compile(source: &str, entry: &str, target: &str) -> std::result::Result<Vec<u8>, String> {
        let entry = CString::new(entry).map_err(|e| e.to_string())?;
        let target = CString::new(target).map_err(|e| e.to_string())?;

        let mut code: Option<ID3DBlob> = None;
        let mut errors: Option<ID3DBlob> = None;
        let result = unsafe {
            D3DCompile(
                source.as_ptr().cast(),
                source.len(),
                PCSTR::null(),
                None,
                None,
                PCSTR(entry.as_ptr().cast()),
                PCSTR(target.as_ptr().cast()),
                D3DCOMPILE_ENABLE_STRICTNESS,
                0,
                &mut code,
                Some(&mut errors),
            )
        };

        match (result, code) {
            (Ok(()), Some(code)) => Ok(blob_bytes(&code).to_vec()),
            (result, _) => Err(errors
                .as_ref()
                .map(|errors| String::from_utf8_lossy(blob_bytes(errors)).into_owned())
                .or_else(|| result.err().map(|e| e.to_string()))
                .unwrap_or_else(|| "D3DCompile produced no bytecode".to_owned())),
        }
    }

    fn reflect_constant_buffers(bytecode: &[u8]) -> Result<Vec<(String, u32)>> {
        let reflection = unsafe {
            let mut raw: *mut c_void = std::ptr::null_mut();
            D3DReflect(bytecode.as_ptr().cast(), bytecode.len(), &ID3D11ShaderReflection::IID, &mut raw)?;
            ID3D11ShaderReflection::from_raw(raw)
        };

        let mut shader_desc = D3D11_SHADER_DESC::default();
        unsafe { reflection.GetDesc(&mut shader_desc)? };

        let mut constant_buffers = Vec::new();
        for i in 0..shader_desc.BoundResources {
            let mut bind_desc = D3D11_SHADER_INPUT_BIND_DESC::default();
            unsafe { reflection.GetResourceBindingDesc(i, &mut bind_desc)? };
            if bind_desc.Type == D3D_SIT_CBUFFER {
                let name = unsafe { bind_desc.Name.to_string()? };
                constant_buffers.push((name, bind_desc.BindPoint));
            }
        }
        Ok(constant_buffers)
    }

    fn bind_targets(&self) {
        unsafe {
            self.context.OMSetRenderTargets(
                Some(&[self.render_target.clone()]),
                self.depth_stencil.as_ref(),
            );
        }
    }
}

fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer().cast::<u8>(), blob.GetBufferSize()) }
}

impl GraphicsDevice for D3D11Device {
    type Stage = D3D11Stage;
    type Program = D3D11Program;
    type Buffer = D3D11Buffer;

    const LANGUAGE: ShaderLanguage = ShaderLanguage::Hlsl;
    const DEPTH_RANGE: DepthRange = DepthRange::ZeroToOne;

    fn apply_default_state(&mut self) {
        let rasterizer_desc = D3D11_RASTERIZER_DESC {
            FillMode: D3D11_FILL_SOLID,
            CullMode: D3D11_CULL_BACK,
            // Cube faces are wound clockwise seen from outside
            FrontCounterClockwise: false.into(),
            DepthClipEnable: true.into(),
            ..Default::default()
        };
        let depth_desc = D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: true.into(),
            DepthWriteMask: D3D11_DEPTH_WRITE_MASK_ALL,
            DepthFunc: D3D11_COMPARISON_LESS,
            ..Default::default()
        };

        unsafe {
            if let Err(e) = self.device.CreateRasterizerState(&rasterizer_desc, Some(&mut self.rasterizer_state)) {
                log::error!("Failed to create rasterizer state: {e}");
            }
            if let Err(e) = self.device.CreateDepthStencilState(&depth_desc, Some(&mut self.depth_state)) {
                log::error!("Failed to create depth-stencil state: {e}");
            }
            self.context.RSSetState(self.rasterizer_state.as_ref());
            self.context.OMSetDepthStencilState(self.depth_state.as_ref(), 0);
            self.context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe { self.context.RSSetViewports(Some(&[viewport])) };
    }

    fn clear(&mut self, color: [f32; 4]) {
        // Flip-model presentation unbinds the back buffer, so bind it again every frame
        self.bind_targets();
        unsafe {
            if let Some(render_target) = self.render_target.as_ref() {
                self.context.ClearRenderTargetView(render_target, &color);
            }
            if let Some(depth_stencil) = self.depth_stencil.as_ref() {
                self.context.ClearDepthStencilView(
                    depth_stencil,
                    (D3D11_CLEAR_DEPTH.0 | D3D11_CLEAR_STENCIL.0) as u32,
                    1.0,
                    0,
                );
            }
        }
    }

    fn create_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage> {
        let (entry, target) = match kind {
            StageKind::Vertex => (HLSL_VERTEX_ENTRY, "vs_4_0"),
            StageKind::Fragment => (HLSL_PIXEL_ENTRY, "ps_4_0"),
        };
        let mut stage = D3D11Stage {
            kind,
            bytecode: Vec::new(),
            errors: String::new(),
            vertex_shader: None,
            pixel_shader: None,
        };

        match Self::compile(source, entry, target) {
            Ok(bytecode) => stage.bytecode = bytecode,
            Err(errors) => {
                stage.errors = errors;
                return Ok(stage);
            }
        }

        unsafe {
            match kind {
                StageKind::Vertex => self.device
                    .CreateVertexShader(&stage.bytecode, None, Some(&mut stage.vertex_shader))
                    .map_err(|e| eyre!("Failed to create vertex shader: {e}"))?,
                StageKind::Fragment => self.device
                    .CreatePixelShader(&stage.bytecode, None, Some(&mut stage.pixel_shader))
                    .map_err(|e| eyre!("Failed to create pixel shader: {e}"))?,
            }
        }
        Ok(stage)
    }

    fn stage_compiled(&self, stage: &Self::Stage) -> bool {
        stage.vertex_shader.is_some() || stage.pixel_shader.is_some()
    }

    fn stage_info_log(&self, stage: &Self::Stage) -> String {
        stage.errors.clone()
    }

    fn delete_stage(&mut self, stage: Self::Stage) {
        drop(stage);
    }

    fn create_program(&mut self) -> Result<Self::Program> {
        Ok(D3D11Program::default())
    }

    fn attach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        match stage.kind {
            StageKind::Vertex => {
                program.vertex_shader = stage.vertex_shader.clone();
                program.vertex_bytecode = Some(stage.bytecode.clone());
            }
            StageKind::Fragment => program.pixel_shader = stage.pixel_shader.clone(),
        }
    }

    fn link_program(&mut self, program: &mut Self::Program) {
        program.linked = false;
        let (Some(_), Some(_), Some(bytecode)) = (
            program.vertex_shader.as_ref(),
            program.pixel_shader.as_ref(),
            program.vertex_bytecode.as_ref(),
        ) else {
            program.info_log = "Program needs both a vertex and a pixel stage".to_owned();
            return;
        };

        let elements = [D3D11_INPUT_ELEMENT_DESC {
            SemanticName: s!("POSITION"),
            SemanticIndex: 0,
            Format: DXGI_FORMAT_R32G32B32_FLOAT,
            InputSlot: 0,
            AlignedByteOffset: 0,
            InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
            InstanceDataStepRate: 0,
        }];
        let mut input_layout = None;
        if let Err(e) = unsafe { self.device.CreateInputLayout(&elements, bytecode, Some(&mut input_layout)) } {
            program.info_log = format!("Input layout does not match the vertex shader: {e}");
            return;
        }

        match Self::reflect_constant_buffers(bytecode) {
            Ok(constant_buffers) => program.constant_buffers = constant_buffers,
            Err(e) => {
                program.info_log = format!("Shader reflection failed: {e}");
                return;
            }
        }

        program.input_layout = input_layout;
        program.linked = program.input_layout.is_some();
    }

    fn program_linked(&self, program: &Self::Program) -> bool {
        program.linked
    }

    fn program_info_log(&self, program: &Self::Program) -> String {
        program.info_log.clone()
    }

    fn detach_stage(&mut self, program: &mut Self::Program, stage: &Self::Stage) {
        if stage.kind == StageKind::Vertex {
            program.vertex_bytecode = None;
        }
    }

    fn delete_program(&mut self, program: Self::Program) {
        drop(program);
    }

    fn uniform_block_index(&mut self, program: &Self::Program, name: &str) -> Option<u32> {
        program.constant_buffers
            .iter()
            .find(|(block, _)| block == name)
            .map(|(_, register)| *register)
    }

    fn bind_uniform_block(&mut self, _program: &Self::Program, block_index: u32, binding: u32) {
        // HLSL fixes the slot with `register(bN)`
        if block_index != binding {
            log::warn!("Constant buffer at b{block_index} cannot be rebound to slot {binding}");
        }
    }

    fn attribute_location(&mut self, program: &Self::Program, name: &str) -> Option<u32> {
        program.input_layout.as_ref()?;
        INPUT_SEMANTICS
            .iter()
            .position(|semantic| semantic.eq_ignore_ascii_case(name))
            .map(|location| location as u32)
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<Self::Buffer> {
        let (bind_flags, shadow) = match kind {
            BufferKind::Vertex => (D3D11_BIND_VERTEX_BUFFER, Vec::new()),
            BufferKind::Index => (D3D11_BIND_INDEX_BUFFER, Vec::new()),
            BufferKind::Uniform => {
                let mut shadow = data.to_vec();
                shadow.resize(data.len().next_multiple_of(16), 0);
                (D3D11_BIND_CONSTANT_BUFFER, shadow)
            }
        };
        let initial = if shadow.is_empty() { data } else { shadow.as_slice() };

        let desc = D3D11_BUFFER_DESC {
            ByteWidth: initial.len() as u32,
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind_flags.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let initial_data = D3D11_SUBRESOURCE_DATA {
            pSysMem: initial.as_ptr().cast(),
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        };
        let mut buffer = None;
        unsafe { self.device.CreateBuffer(&desc, Some(&initial_data), Some(&mut buffer)) }
            .map_err(|e| eyre!("Failed to create {kind:?} buffer: {e}"))?;

        Ok(D3D11Buffer {
            buffer: buffer.ok_or_eyre("Buffer creation returned nothing")?,
            kind,
            shadow,
        })
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, offset: usize, data: &[u8]) {
        let end = offset + data.len();
        match buffer.kind {
            BufferKind::Uniform => {
                let Some(target) = buffer.shadow.get_mut(offset..end) else {
                    log::error!("Constant buffer update {offset}..{end} is out of bounds");
                    return;
                };
                target.copy_from_slice(data);
                unsafe {
                    self.context.UpdateSubresource(&buffer.buffer, 0, None, buffer.shadow.as_ptr().cast(), 0, 0);
                }
            }
            BufferKind::Vertex | BufferKind::Index => {
                let region = D3D11_BOX {
                    left: offset as u32,
                    top: 0,
                    front: 0,
                    right: end as u32,
                    bottom: 1,
                    back: 1,
                };
                unsafe {
                    self.context.UpdateSubresource(&buffer.buffer, 0, Some(&region), data.as_ptr().cast(), 0, 0);
                }
            }
        }
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        drop(buffer);
    }

    fn use_program(&mut self, program: &Self::Program) {
        unsafe {
            self.context.IASetInputLayout(program.input_layout.as_ref());
            self.context.VSSetShader(program.vertex_shader.as_ref(), None);
            self.context.PSSetShader(program.pixel_shader.as_ref(), None);
        }
    }

    fn bind_geometry(
        &mut self,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
        _position_location: u32,
        vertex_stride: u32,
    ) {
        let offset = 0;
        unsafe {
            self.context.IASetVertexBuffers(
                0,
                1,
                Some(&Some(vertices.buffer.clone())),
                Some(&vertex_stride),
                Some(&offset),
            );
            self.context.IASetIndexBuffer(&indices.buffer, DXGI_FORMAT_R16_UINT, 0);
        }
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: &Self::Buffer) {
        let buffers = [Some(buffer.buffer.clone())];
        unsafe {
            self.context.VSSetConstantBuffers(binding, Some(&buffers));
            self.context.PSSetConstantBuffers(binding, Some(&buffers));
        }
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe { self.context.DrawIndexed(index_count, 0, 0) };
    }
}

impl Drop for D3D11Device {
    fn drop(&mut self) {
        unsafe { self.context.ClearState() };
    }
}
