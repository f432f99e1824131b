//! Detection configuration

use crate::blobs::BlobConfig;
use crate::template::TemplateConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub template_config: TemplateConfig,
    pub blob_config: BlobConfig,
    pub template_dirs: Vec<PathBuf>,
    /// File stem of the power-up icon inside `template_dirs`.
    pub power_template: String,
    pub visualization: VisualizationConfig,
}

/// Debug overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub enabled: bool,
    /// Dump one annotated frame every this many ticks.
    pub every_n_ticks: u64,
    pub output_dir: PathBuf,
    pub draw_rois: bool,
    pub draw_blobs: bool,
    pub draw_labels: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            template_config: TemplateConfig::default(),
            blob_config: BlobConfig::default(),
            template_dirs: vec!["assets/png".into()],
            power_template: "power".to_string(),
            visualization: VisualizationConfig::default(),
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            every_n_ticks: 60,
            output_dir: "assets/png/outputs".into(),
            draw_rois: true,
            draw_blobs: true,
            draw_labels: true,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.template_config.validate()?;
        self.blob_config.validate()?;
        anyhow::ensure!(
            self.visualization.every_n_ticks > 0,
            "overlay dump interval must be at least one tick"
        );
        Ok(())
    }
}
