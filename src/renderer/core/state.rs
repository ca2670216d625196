use color_eyre::Result;
use color_eyre::eyre::eyre;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Drawing,
}

/// Contains often-mutated flags and other state information
pub struct RenderState {
    pub phase: FramePhase,
    pub init_attempted: bool,
    pub undrawable_reported: bool,
    /// View, projection and lights have been uploaded for the current frame
    pub frame_uniforms_written: bool,
}

impl RenderState {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            init_attempted: false,
            undrawable_reported: false,
            frame_uniforms_written: false,
        }
    }

    pub fn begin_frame(&mut self) -> Result<()> {
        match self.phase {
            FramePhase::Idle => {
                self.phase = FramePhase::Drawing;
                self.frame_uniforms_written = false;
                Ok(())
            }
            FramePhase::Drawing => Err(eyre!("begin_frame called while a frame is in progress")),
        }
    }

    pub fn expect_drawing(&self, operation: &str) -> Result<()> {
        match self.phase {
            FramePhase::Drawing => Ok(()),
            FramePhase::Idle => Err(eyre!("{operation} called outside of begin_frame/end_frame")),
        }
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.expect_drawing("end_frame")?;
        self.phase = FramePhase::Idle;
        Ok(())
    }
}
