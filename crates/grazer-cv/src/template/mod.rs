//! Power-up template matching

pub mod loader;
pub mod matcher;

pub use loader::TemplateLoader;
pub use matcher::{PowerUpMatch, PowerUpMatcher};

use grazer_core::RoiExtents;
use opencv::{core::Mat, prelude::*};
use serde::{Deserialize, Serialize};

/// A grayscale reference image.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub image: Mat,
}

impl Template {
    pub fn new(name: String, image: Mat) -> Self {
        Self { name, image }
    }

    pub fn width(&self) -> i32 {
        self.image.cols()
    }

    pub fn height(&self) -> i32 {
        self.image.rows()
    }
}

/// Template matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Normalized squared-difference cutoff; a candidate must score strictly below it.
    pub threshold: f64,
    /// Search window around the player. Reaches further up than down since
    /// power-ups drift toward the bottom of the screen.
    pub extents: RoiExtents,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.20,
            extents: RoiExtents {
                left: 100,
                right: 100,
                up: 75,
                down: 25,
            },
        }
    }
}

impl TemplateConfig {
    /// Whole-playfield search, for titles where power-ups home in from anywhere
    pub fn full_screen() -> Self {
        Self {
            extents: RoiExtents::square(512),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.threshold > 0.0 && self.threshold <= 1.0,
            "template threshold must be in (0, 1], got {}",
            self.threshold
        );
        let e = self.extents;
        anyhow::ensure!(
            e.left >= 0 && e.right >= 0 && e.up >= 0 && e.down >= 0,
            "template search extents must be non-negative"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TemplateConfig::default().validate().is_ok());
        assert!(TemplateConfig::full_screen().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let config = TemplateConfig {
            threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
