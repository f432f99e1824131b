//! High-level per-frame detector

use super::config::DetectionConfig;
use crate::blobs::BlobSegmenter;
use crate::frame::Playfield;
use crate::template::{PowerUpMatch, PowerUpMatcher, Template, TemplateLoader};
use crate::Result;
use grazer_core::{Blob, Rect, RoiExtents, Vec2};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Everything the vision stage found in one frame, in game space unless noted.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDetections {
    pub power_roi: Rect,
    pub power_up: Option<PowerUpMatch>,
    pub blob_roi: Rect,
    /// Contours are local to `blob_roi`.
    pub blobs: Vec<Blob>,
    pub stats: DetectionStats,
}

/// Detection statistics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DetectionStats {
    pub blob_count: usize,
    pub blob_pixels: u64,
    pub power_up_score: Option<f64>,
    pub processing_time_ms: u64,
}

/// Runs the template matcher and the blob segmenter over a playfield
pub struct FrameDetector {
    matcher: Option<PowerUpMatcher>,
    segmenter: BlobSegmenter,
    power_extents: RoiExtents,
}

impl FrameDetector {
    /// Detector with an explicit template; `None` disables power-up search.
    pub fn new(config: &DetectionConfig, template: Option<Template>) -> Self {
        Self {
            matcher: template.map(|t| PowerUpMatcher::new(config.template_config.clone(), t)),
            segmenter: BlobSegmenter::new(config.blob_config.clone()),
            power_extents: config.template_config.extents,
        }
    }

    /// Detector whose template is looked up in the configured directories
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        let mut loader = TemplateLoader::new();
        for dir in &config.template_dirs {
            loader = loader.add_template_dir(dir);
        }

        let template = loader.load_template(&config.power_template)?;
        if template.is_none() {
            warn!(
                name = %config.power_template,
                "power-up template not found; power-up attraction disabled"
            );
        }
        Ok(Self::new(config, template))
    }

    pub fn has_template(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn template(&self) -> Option<&Template> {
        self.matcher.as_ref().map(|m| m.template())
    }

    /// `player` is in game space; `blob_extents` follows the detection radius.
    pub fn detect(&self, playfield: &Playfield, player: Vec2, blob_extents: RoiExtents) -> Result<FrameDetections> {
        let start_time = Instant::now();

        let power_roi = playfield.roi(player, self.power_extents);
        let power_up = match &self.matcher {
            Some(matcher) => matcher.find_nearest(&playfield.region(power_roi), player)?,
            None => None,
        };

        let blob_roi = playfield.roi(player, blob_extents);
        let blobs = self.segmenter.segment(&playfield.region(blob_roi))?;

        let stats = DetectionStats {
            blob_count: blobs.len(),
            blob_pixels: blobs.iter().map(|b| b.area as u64).sum(),
            power_up_score: power_up.map(|m| m.score),
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };
        debug!(
            blobs = stats.blob_count,
            power_up = ?power_up.map(|m| m.center()),
            "frame detections"
        );

        Ok(FrameDetections {
            power_roi,
            power_up,
            blob_roi,
            blobs,
            stats,
        })
    }
}
