//! Eye-tracking result items produced by the detection pipeline.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EyeId {
    Left,
    Right,
}

impl EyeId {
    pub fn opposite(self) -> Self {
        match self {
            EyeId::Left => EyeId::Right,
            EyeId::Right => EyeId::Left,
        }
    }
}

/// One computed result for a single eye.
///
/// Consumed exactly once by the outbound worker. `y` and `blink` are only
/// present when the pipeline produced them for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeData {
    pub eye: EyeId,
    pub x: f32,
    pub y: Option<f32>,
    pub blink: Option<f32>,
}

impl EyeData {
    pub fn new(eye: EyeId, x: f32) -> Self {
        Self {
            eye,
            x,
            y: None,
            blink: None,
        }
    }

    pub fn with_y(mut self, y: f32) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_blink(mut self, blink: f32) -> Self {
        self.blink = Some(blink);
        self
    }
}
