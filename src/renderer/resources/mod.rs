/// "Resources" refers to middle-level objects that created by "Core" objects.
/// They are relatively intuitive and managed by the user.

pub mod buffer;
pub mod grid;
pub mod light;
pub mod mesh;
pub mod shader;
