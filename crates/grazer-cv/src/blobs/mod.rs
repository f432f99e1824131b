//! Bright-blob segmentation for projectile detection

pub mod segmenter;

pub use segmenter::BlobSegmenter;

use serde::{Deserialize, Serialize};

/// Blob segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Box-blur kernel side, odd.
    pub blur_kernel: i32,
    /// Pixels at or above this brightness after blurring are foreground.
    pub brightness_cutoff: u8,
    pub min_area: u32,
    /// Larger components are the player's sprite or background art.
    pub max_area: u32,
    /// 4 or 8.
    pub connectivity: i32,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 3,
            brightness_cutoff: 240,
            min_area: 10,
            max_area: 500,
            connectivity: 8,
        }
    }
}

impl BlobConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.blur_kernel >= 1 && self.blur_kernel % 2 == 1,
            "blur kernel must be a positive odd size, got {}",
            self.blur_kernel
        );
        anyhow::ensure!(
            self.min_area <= self.max_area,
            "blob area band [{}, {}] is inverted",
            self.min_area,
            self.max_area
        );
        anyhow::ensure!(
            matches!(self.connectivity, 4 | 8),
            "connectivity must be 4 or 8, got {}",
            self.connectivity
        );
        Ok(())
    }

    pub fn accepts_area(&self, area: u32) -> bool {
        (self.min_area..=self.max_area).contains(&area)
    }
}
