/// "Core" refers to high-level objects that are used to manage the state of the renderer.
/// They can also create "Resources" objects.

pub mod device;
pub mod renderer;
pub mod state;

#[cfg(test)]
pub mod recording;
