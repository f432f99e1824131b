//! Nearest-candidate template matching with normalized squared difference

use super::{Template, TemplateConfig};
use crate::frame::RegionView;
use crate::Result;
use anyhow::Context;
use grazer_core::{Rect, Vec2};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The accepted candidate closest to the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerUpMatch {
    /// Template placement, local to `roi`.
    pub rect: Rect,
    /// Search region in game space.
    pub roi: Rect,
    /// TM_SQDIFF_NORMED score, lower is better.
    pub score: f64,
}

impl PowerUpMatch {
    /// Placement in game space.
    pub fn game_rect(&self) -> Rect {
        self.roi.rect_to_parent(self.rect)
    }

    /// Center in game space.
    pub fn center(&self) -> Vec2 {
        self.roi.to_parent_vec(self.rect.center())
    }
}

/// Candidate offset within the score map.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: i32,
    y: i32,
    score: f32,
    dist_sq: f64,
}

pub struct PowerUpMatcher {
    config: TemplateConfig,
    template: Template,
}

impl PowerUpMatcher {
    pub fn new(config: TemplateConfig, template: Template) -> Self {
        Self { config, template }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Search `region` for the template; `player` is in game space.
    ///
    /// Returns `None` when nothing scores under the threshold, or when the region is
    /// too small to hold the template (the player is hugging a corner).
    pub fn find_nearest(&self, region: &RegionView<'_>, player: Vec2) -> Result<Option<PowerUpMatch>> {
        let (tw, th) = (self.template.width(), self.template.height());
        if region.width() < tw || region.height() < th {
            return Ok(None);
        }

        let image = region.to_mat()?;
        let mut result = Mat::default();
        imgproc::match_template(
            &image,
            &self.template.image,
            &mut result,
            imgproc::TM_SQDIFF_NORMED,
            &core::no_array(),
        )
        .context("Template matching failed")?;

        let cols = result.cols() as usize;
        let scores = result.data_typed::<f32>()?;
        let roi = region.rect();
        let scan = Scan {
            threshold: self.config.threshold,
            template_size: (tw, th),
            roi,
            player,
        };

        Ok(scan.best(scores, cols).map(|c| PowerUpMatch {
            rect: Rect::new(c.x, c.y, tw, th),
            roi,
            score: c.score as f64,
        }))
    }
}

/// Everything needed to rank one score map, detached from OpenCV types.
#[derive(Debug, Clone, Copy)]
struct Scan {
    threshold: f64,
    template_size: (i32, i32),
    roi: Rect,
    player: Vec2,
}

impl Scan {
    fn candidate(&self, x: usize, y: usize, score: f32) -> Option<Candidate> {
        // NaN never passes.
        if !((score as f64) < self.threshold) {
            return None;
        }
        let (tw, th) = self.template_size;
        let local = Rect::new(x as i32, y as i32, tw, th);
        let dist_sq = self.roi.to_parent_vec(local.center()).distance_sq(self.player);
        Some(Candidate {
            x: x as i32,
            y: y as i32,
            score,
            dist_sq,
        })
    }

    /// Raster scan; the strict comparison keeps the first hit on equal distance.
    #[cfg(not(feature = "parallel"))]
    fn best(&self, scores: &[f32], cols: usize) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (y, row) in scores.chunks(cols).enumerate() {
            for (x, &score) in row.iter().enumerate() {
                if let Some(c) = self.candidate(x, y, score) {
                    if best.is_none_or(|b| c.dist_sq < b.dist_sq) {
                        best = Some(c);
                    }
                }
            }
        }
        best
    }

    /// Rows in parallel, reduced on (distance, row, column) so the raster tie-break holds.
    #[cfg(feature = "parallel")]
    fn best(&self, scores: &[f32], cols: usize) -> Option<Candidate> {
        let scan = *self;
        scores
            .par_chunks(cols)
            .enumerate()
            .flat_map_iter(move |(y, row)| {
                row.iter()
                    .enumerate()
                    .filter_map(move |(x, &score)| scan.candidate(x, y, score))
            })
            .min_by(|a, b| {
                a.dist_sq
                    .total_cmp(&b.dist_sq)
                    .then(a.y.cmp(&b.y))
                    .then(a.x.cmp(&b.x))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Playfield};
    use crate::template::TemplateLoader;
    use grazer_core::{CaptureBox, RoiExtents};
    use image::{GrayImage, Luma};

    const ICON: u32 = 6;

    /// 1-px checkerboard; only lines up with itself at the exact offset.
    fn icon() -> GrayImage {
        GrayImage::from_fn(ICON, ICON, |x, y| {
            if (x + y) % 2 == 0 { Luma([255]) } else { Luma([60]) }
        })
    }

    fn playfield_with_icons(size: u32, at: &[(u32, u32)]) -> Playfield {
        let icon = icon();
        let mut data = vec![0u8; (size * size * 4) as usize];
        for &(ox, oy) in at {
            for (x, y, px) in icon.enumerate_pixels() {
                let i = (((oy + y) * size + ox + x) * 4) as usize;
                let v = px.0[0];
                data[i..i + 4].copy_from_slice(&[v, v, v, 255]);
            }
        }
        let frame = Frame::from_bgra(size, size, data).unwrap();
        let cbox = CaptureBox::new(Rect::new(0, 0, size as i32, size as i32));
        Playfield::extract(&frame, &cbox).unwrap()
    }

    fn matcher() -> PowerUpMatcher {
        let template = TemplateLoader::from_gray("power", &icon()).unwrap();
        PowerUpMatcher::new(TemplateConfig::default(), template)
    }

    #[test]
    fn test_finds_icon_in_region() -> Result<()> {
        let playfield = playfield_with_icons(128, &[(40, 30)]);
        let region = playfield.region(Rect::new(20, 20, 60, 40));
        let found = matcher()
            .find_nearest(&region, Vec2::new(64.0, 64.0))?
            .expect("icon should match");

        assert_eq!(found.rect, Rect::new(20, 10, 6, 6));
        assert_eq!(found.game_rect(), Rect::new(40, 30, 6, 6));
        assert_eq!(found.center(), Vec2::new(43.0, 33.0));
        assert!(found.score < 0.01);
        Ok(())
    }

    #[test]
    fn test_prefers_icon_nearest_player() -> Result<()> {
        let playfield = playfield_with_icons(128, &[(10, 10), (90, 90)]);
        let region = playfield.region(playfield.bounds());
        let m = matcher();

        let near_far_corner = m.find_nearest(&region, Vec2::new(120.0, 120.0))?.unwrap();
        assert_eq!(near_far_corner.game_rect().origin(), grazer_core::Point::new(90, 90));

        let near_origin = m.find_nearest(&region, Vec2::new(0.0, 0.0))?.unwrap();
        assert_eq!(near_origin.game_rect().origin(), grazer_core::Point::new(10, 10));
        Ok(())
    }

    #[test]
    fn test_equal_distance_keeps_first_in_raster_order() -> Result<()> {
        // Player exactly between two icons on the same row.
        let playfield = playfield_with_icons(128, &[(20, 50), (80, 50)]);
        let region = playfield.region(playfield.bounds());
        let found = matcher().find_nearest(&region, Vec2::new(53.0, 53.0))?.unwrap();
        assert_eq!(found.game_rect().origin(), grazer_core::Point::new(20, 50));
        Ok(())
    }

    #[test]
    fn test_blank_region_has_no_match() -> Result<()> {
        let playfield = playfield_with_icons(64, &[]);
        let region = playfield.region(playfield.bounds());
        assert!(matcher().find_nearest(&region, Vec2::new(32.0, 32.0))?.is_none());
        Ok(())
    }

    #[test]
    fn test_region_smaller_than_template_has_no_match() -> Result<()> {
        let playfield = playfield_with_icons(64, &[(0, 0)]);
        let roi = playfield.roi(Vec2::new(0.0, 0.0), RoiExtents::square(4));
        assert_eq!(roi, Rect::new(0, 0, 4, 4));
        let region = playfield.region(roi);
        assert!(matcher().find_nearest(&region, Vec2::new(0.0, 0.0))?.is_none());
        Ok(())
    }
}
