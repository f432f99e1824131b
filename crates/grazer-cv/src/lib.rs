//! Grazer Computer Vision Library
//!
//! Turns captured frames into what the dodging loop needs: the nearest power-up
//! and the bright blobs around the player. Built on OpenCV.

pub mod blobs;
pub mod detection;
pub mod frame;
pub mod overlay;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use blobs::{BlobConfig, BlobSegmenter};
pub use detection::{DetectionConfig, DetectionStats, FrameDetections, FrameDetector, VisualizationConfig};
pub use frame::{CaptureError, Frame, Playfield, RegionView};
pub use overlay::{Annotator, OverlayScene};
pub use template::{PowerUpMatch, PowerUpMatcher, Template, TemplateConfig, TemplateLoader};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use crate::frame::{CaptureError, Frame};
    use std::time::Duration;

    /// Something that produces frames of the game window.
    ///
    /// `capture` blocks the calling thread until a frame arrives or `timeout`
    /// elapses. Callers never retry within a tick.
    pub trait FrameSource {
        fn capture(&mut self, timeout: Duration) -> Result<Frame, CaptureError>;
    }

    impl<S: FrameSource + ?Sized> FrameSource for &mut S {
        fn capture(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
            (**self).capture(timeout)
        }
    }

    impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
        fn capture(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
            (**self).capture(timeout)
        }
    }
}
