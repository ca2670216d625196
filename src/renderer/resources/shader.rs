use color_eyre::Result;
use color_eyre::eyre::{OptionExt, eyre};
use crate::renderer::core::device::{GraphicsDevice, ShaderLanguage, StageKind};
use crate::renderer::shader_data::{LIGHT_COUNT, MATRICES_BINDING, MATRICES_BLOCK_NAME};

const POSITION_ATTRIBUTE: &str = "position";

const GLSL_MATRICES_BLOCK: &str = r#"
struct PointLight {
    vec3 position;
    vec3 color;
};

layout (std140) uniform matrices {
    mat4 model;
    mat4 view;
    mat4 projection;
    PointLight lights[LIGHT_COUNT];
};
"#;

const GLSL_CUBE_VERT: &str = r#"
layout (location = 0) in vec3 position;

out vec3 viewPosition;

void main() {
    vec4 viewSpace = view * model * vec4(position, 1.0);
    viewPosition = viewSpace.xyz;
    gl_Position = projection * viewSpace;
}
"#;

const GLSL_CUBE_FRAG: &str = r#"
in vec3 viewPosition;

out vec4 frag_color;

void main() {
    vec3 normal = normalize(cross(dFdx(viewPosition), dFdy(viewPosition)));
    if (dot(normal, -viewPosition) < 0.0) {
        normal = -normal;
    }

    vec3 albedo = vec3(1.0, 0.0, 0.0);
    vec3 lighting = vec3(0.05);
    for (int i = 0; i < LIGHT_COUNT; i++) {
        vec3 toLight = (view * vec4(lights[i].position, 1.0)).xyz - viewPosition;
        float distanceSq = max(dot(toLight, toLight), 0.0001);
        float diffuse = max(dot(normal, normalize(toLight)), 0.0);
        lighting += lights[i].color * diffuse / distanceSq;
    }
    frag_color = vec4(albedo * lighting, 1.0);
}
"#;

const HLSL_CUBE: &str = r#"
struct PointLight {
    float3 position;
    float3 color;
};

cbuffer matrices : register(b0) {
    float4x4 model;
    float4x4 view;
    float4x4 projection;
    PointLight lights[LIGHT_COUNT];
};

struct VSInput {
    float3 position : POSITION;
};

struct PSInput {
    float4 position : SV_POSITION;
    float3 viewPosition : VIEWPOS;
};

PSInput VSMain(VSInput input) {
    float4 viewSpace = mul(view, mul(model, float4(input.position, 1.0)));
    PSInput output;
    output.viewPosition = viewSpace.xyz;
    output.position = mul(projection, viewSpace);
    return output;
}

float4 PSMain(PSInput input) : SV_TARGET {
    float3 normal = normalize(cross(ddx(input.viewPosition), ddy(input.viewPosition)));
    if (dot(normal, -input.viewPosition) < 0.0) {
        normal = -normal;
    }

    float3 albedo = float3(1.0, 0.0, 0.0);
    float3 lighting = float3(0.05, 0.05, 0.05);
    [unroll]
    for (int i = 0; i < LIGHT_COUNT; i++) {
        float3 toLight = mul(view, float4(lights[i].position, 1.0)).xyz - input.viewPosition;
        float distanceSq = max(dot(toLight, toLight), 0.0001);
        float diffuse = max(dot(normal, normalize(toLight)), 0.0);
        lighting += lights[i].color * diffuse / distanceSq;
    }
    return float4(albedo * lighting, 1.0);
}
"#;

pub const HLSL_VERTEX_ENTRY: &str = "VSMain";
pub const HLSL_PIXEL_ENTRY: &str = "PSMain";

/// Vertex and fragment sources of the lit cube program
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn lit_cube(language: ShaderLanguage) -> Self {
        match language {
            ShaderLanguage::Glsl330 => {
                let header = format!("#version 330 core\n#define LIGHT_COUNT {LIGHT_COUNT}\n");
                Self {
                    vertex: format!("{header}{GLSL_MATRICES_BLOCK}{GLSL_CUBE_VERT}"),
                    fragment: format!("{header}{GLSL_MATRICES_BLOCK}{GLSL_CUBE_FRAG}"),
                }
            }
            ShaderLanguage::Hlsl => {
                let source = format!("#define LIGHT_COUNT {LIGHT_COUNT}\n{HLSL_CUBE}");
                Self {
                    vertex: source.clone(),
                    fragment: source,
                }
            }
        }
    }
}

/// Locations resolved once after linking
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProgramBindings {
    pub matrices_block: u32,
    pub position_location: u32,
}

/// Linked vertex + fragment program. The stages stay alive (detached) until
/// [`ShaderProgram::destroy`].
pub struct ShaderProgram<D: GraphicsDevice> {
    pub program: D::Program,
    pub bindings: ProgramBindings,
    vert_stage: D::Stage,
    frag_stage: D::Stage,
}

impl<D: GraphicsDevice> ShaderProgram<D> {
    pub fn new(device: &mut D, sources: &ShaderSources) -> Result<Self> {
        let vert_stage = compile_stage(device, StageKind::Vertex, &sources.vertex)?;
        let frag_stage = match compile_stage(device, StageKind::Fragment, &sources.fragment) {
            Ok(stage) => stage,
            Err(e) => {
                device.delete_stage(vert_stage);
                return Err(e);
            }
        };

        let mut program = match device.create_program() {
            Ok(program) => program,
            Err(e) => {
                device.delete_stage(vert_stage);
                device.delete_stage(frag_stage);
                return Err(e);
            }
        };
        device.attach_stage(&mut program, &vert_stage);
        device.attach_stage(&mut program, &frag_stage);
        device.link_program(&mut program);

        if !device.program_linked(&program) {
            let info_log = device.program_info_log(&program);
            log::error!("Error linking program: {info_log}");
            device.delete_program(program);
            device.delete_stage(vert_stage);
            device.delete_stage(frag_stage);
            return Err(eyre!("Failed to link shader program: {info_log}"));
        }

        device.detach_stage(&mut program, &vert_stage);
        device.detach_stage(&mut program, &frag_stage);

        let bindings = match resolve_bindings(device, &program) {
            Ok(bindings) => bindings,
            Err(e) => {
                log::error!("Error resolving program bindings: {e}");
                device.delete_program(program);
                device.delete_stage(vert_stage);
                device.delete_stage(frag_stage);
                return Err(e);
            }
        };

        Ok(Self {
            program,
            bindings,
            vert_stage,
            frag_stage,
        })
    }

    pub fn destroy(self, device: &mut D) {
        device.delete_program(self.program);
        device.delete_stage(self.vert_stage);
        device.delete_stage(self.frag_stage);
    }
}

fn compile_stage<D: GraphicsDevice>(
    device: &mut D,
    kind: StageKind,
    source: &str,
) -> Result<D::Stage> {
    let stage = device.create_stage(kind, source)?;
    if !device.stage_compiled(&stage) {
        let info_log = device.stage_info_log(&stage);
        log::error!("Error compiling {kind:?} shader: {info_log}");
        device.delete_stage(stage);
        return Err(eyre!("Failed to compile {kind:?} shader: {info_log}"));
    }
    Ok(stage)
}

fn resolve_bindings<D: GraphicsDevice>(
    device: &mut D,
    program: &D::Program,
) -> Result<ProgramBindings> {
    let matrices_block = device
        .uniform_block_index(program, MATRICES_BLOCK_NAME)
        .ok_or_eyre(format!("Uniform block `{MATRICES_BLOCK_NAME}` not found"))?;
    device.bind_uniform_block(program, matrices_block, MATRICES_BINDING);

    let position_location = device
        .attribute_location(program, POSITION_ATTRIBUTE)
        .ok_or_eyre(format!("Attribute `{POSITION_ATTRIBUTE}` not found"))?;

    Ok(ProgramBindings {
        matrices_block,
        position_location,
    })
}
