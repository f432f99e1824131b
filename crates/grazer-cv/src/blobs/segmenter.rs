//! Blur, threshold, label, outline

use super::BlobConfig;
use crate::frame::RegionView;
use crate::Result;
use anyhow::Context;
use grazer_core::{Blob, Point, Rect};
use opencv::{
    core::{self, Mat, Size, Vec4i, Vector, CV_32S},
    imgproc,
    prelude::*,
};
use tracing::trace;

/// Stateless per-tick segmenter; nothing carries over between calls.
pub struct BlobSegmenter {
    config: BlobConfig,
}

impl BlobSegmenter {
    pub fn new(config: BlobConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Binary foreground mask of `region` (255 = foreground).
    pub fn mask(&self, region: &RegionView<'_>) -> Result<Mat> {
        let image = region.to_mat()?;
        let k = self.config.blur_kernel;

        let mut blurred = Mat::default();
        imgproc::blur(
            &image,
            &mut blurred,
            Size::new(k, k),
            core::Point::new(-1, -1),
            core::BORDER_DEFAULT,
        )
        .context("Blur failed")?;

        // THRESH_BINARY keeps values strictly above the threshold.
        let mut mask = Mat::default();
        imgproc::threshold(
            &blurred,
            &mut mask,
            self.config.brightness_cutoff as f64 - 1.0,
            255.0,
            imgproc::THRESH_BINARY,
        )
        .context("Threshold failed")?;

        Ok(mask)
    }

    /// Blobs inside the area band, with contours local to `region`.
    pub fn segment(&self, region: &RegionView<'_>) -> Result<Vec<Blob>> {
        if region.is_empty() {
            return Ok(Vec::new());
        }
        let mask = self.mask(region)?;

        let mut labels = Mat::default();
        let mut stats = Mat::default();
        let mut centroids = Mat::default();
        let count = imgproc::connected_components_with_stats(
            &mask,
            &mut labels,
            &mut stats,
            &mut centroids,
            self.config.connectivity,
            CV_32S,
        )
        .context("Connected components failed")?;

        // Two-level hierarchy: a component sitting in another one's hole is still
        // top level, unlike with RETR_EXTERNAL.
        let mut contours = Vector::<Vector<core::Point>>::new();
        let mut hierarchy = Vector::<Vec4i>::new();
        imgproc::find_contours_with_hierarchy(
            &mask,
            &mut contours,
            &mut hierarchy,
            imgproc::RETR_CCOMP,
            imgproc::CHAIN_APPROX_NONE,
            core::Point::new(0, 0),
        )
        .context("Contour extraction failed")?;

        let mut seen = vec![false; count.max(0) as usize];
        let mut blobs = Vec::new();

        for (contour, node) in contours.iter().zip(hierarchy.iter()) {
            // [next, previous, first child, parent]; holes have a parent.
            if node.0[3] >= 0 {
                continue;
            }
            let Some(first) = contour.iter().next() else {
                continue;
            };
            let label = *labels.at_2d::<i32>(first.y, first.x)?;
            // Label 0 is background; keep one outline per component.
            if label <= 0 || seen[label as usize] {
                continue;
            }
            seen[label as usize] = true;

            let area = *stats.at_2d::<i32>(label, imgproc::CC_STAT_AREA)? as u32;
            if !self.config.accepts_area(area) {
                trace!(area, "blob outside area band");
                continue;
            }

            let bounds = Rect::new(
                *stats.at_2d::<i32>(label, imgproc::CC_STAT_LEFT)?,
                *stats.at_2d::<i32>(label, imgproc::CC_STAT_TOP)?,
                *stats.at_2d::<i32>(label, imgproc::CC_STAT_WIDTH)?,
                *stats.at_2d::<i32>(label, imgproc::CC_STAT_HEIGHT)?,
            );

            blobs.push(Blob {
                area,
                contour: contour.iter().map(|p| Point::new(p.x, p.y)).collect(),
                bounds,
            });
        }

        Ok(blobs)
    }
}
