//! Per-frame detection: power-up plus projectiles

pub mod config;
pub mod detector;

pub use config::{DetectionConfig, VisualizationConfig};
pub use detector::{DetectionStats, FrameDetections, FrameDetector};
