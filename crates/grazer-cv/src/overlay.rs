//! Debug overlay: draws one tick's view of the world onto the playfield and dumps it

use crate::detection::{FrameDetections, VisualizationConfig};
use crate::frame::Playfield;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use grazer_core::{Rect, Vec2};
use opencv::{
    core::{self, Mat, Scalar, Vector},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::path::PathBuf;

/// The non-vision facts of a tick worth drawing.
#[derive(Debug, Clone, Copy)]
pub struct OverlayScene<'a> {
    pub tick: u64,
    /// Game space.
    pub player: Vec2,
    pub radius: f64,
    pub force: Vec2,
    pub detections: &'a FrameDetections,
    pub movement_enabled: bool,
    pub assist_target: Option<Vec2>,
}

// BGRA
const PLAYER: (f64, f64, f64) = (0.0, 255.0, 0.0);
const THREAT: (f64, f64, f64) = (0.0, 0.0, 255.0);
const POWER: (f64, f64, f64) = (255.0, 128.0, 0.0);
const ROI: (f64, f64, f64) = (128.0, 128.0, 128.0);
const FORCE: (f64, f64, f64) = (0.0, 255.0, 255.0);
const ASSIST: (f64, f64, f64) = (255.0, 0.0, 255.0);

fn color((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 255.0)
}

fn cv_point(p: Vec2) -> core::Point {
    core::Point::new(p.x.round() as i32, p.y.round() as i32)
}

fn cv_rect(r: Rect) -> core::Rect {
    core::Rect::new(r.x, r.y, r.width, r.height)
}

pub struct Annotator {
    config: VisualizationConfig,
}

impl Annotator {
    pub fn new(config: VisualizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.config
    }

    pub fn should_dump(&self, tick: u64) -> bool {
        self.config.enabled && self.config.every_n_ticks > 0 && tick % self.config.every_n_ticks == 0
    }

    /// Annotated copy of the playfield; the playfield itself is untouched.
    pub fn annotate(&self, playfield: &Playfield, scene: &OverlayScene<'_>) -> Result<Mat> {
        let mut output = playfield.color().try_clone()?;
        let detections = scene.detections;
        let player = cv_point(scene.player);

        if self.config.draw_rois {
            for roi in [detections.power_roi, detections.blob_roi] {
                imgproc::rectangle(&mut output, cv_rect(roi), color(ROI), 1, LINE_8, 0)?;
            }
        }

        imgproc::circle(&mut output, player, scene.radius.round() as i32, color(THREAT), 1, LINE_8, 0)?;
        imgproc::circle(&mut output, player, 3, color(PLAYER), -1, LINE_8, 0)?;

        if let Some(power) = detections.power_up {
            imgproc::rectangle(&mut output, cv_rect(power.game_rect()), color(POWER), 2, LINE_8, 0)?;
        }

        if self.config.draw_blobs {
            let roi = detections.blob_roi;
            let mut outlines = Vector::<Vector<core::Point>>::new();
            for blob in &detections.blobs {
                let outline: Vector<core::Point> = blob
                    .contour
                    .iter()
                    .map(|&p| {
                        let g = roi.to_parent(p);
                        core::Point::new(g.x, g.y)
                    })
                    .collect();
                outlines.push(outline);
            }
            if !outlines.is_empty() {
                imgproc::polylines(&mut output, &outlines, true, color(THREAT), 1, LINE_8, 0)?;
            }
        }

        if let Some(target) = scene.assist_target {
            imgproc::circle(&mut output, cv_point(target), 5, color(ASSIST), 1, LINE_8, 0)?;
        }

        // Force is drawn at one pixel per unit, capped so a panic-sized push stays on screen.
        let tip = match scene.force.normalized() {
            Some(unit) => scene.player + unit * scene.force.length().min(60.0),
            None => scene.player,
        };
        imgproc::line(&mut output, player, cv_point(tip), color(FORCE), 2, LINE_8, 0)?;

        if self.config.draw_labels {
            let labels = [
                format!("tick {}", scene.tick),
                format!("move {}", if scene.movement_enabled { "on" } else { "off" }),
                format!("assist {}", if scene.assist_target.is_some() { "on" } else { "off" }),
                format!("r {:.1}  f {}", scene.radius, scene.force),
            ];
            for (i, label) in labels.iter().enumerate() {
                imgproc::put_text(
                    &mut output,
                    label,
                    core::Point::new(5, 15 + 15 * i as i32),
                    FONT_HERSHEY_SIMPLEX,
                    0.4,
                    color(PLAYER),
                    1,
                    LINE_8,
                    false,
                )?;
            }
        }

        Ok(output)
    }

    /// Annotates and writes `tick_NNNNNN.png` into the output directory.
    pub fn dump(&self, playfield: &Playfield, scene: &OverlayScene<'_>) -> Result<PathBuf> {
        let output = self.annotate(playfield, scene)?;
        std::fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("Failed to create overlay dir: {:?}", self.config.output_dir))?;
        let path = self.config.output_dir.join(format!("tick_{:06}.png", scene.tick));
        ImageUtils::save_image(&output, &path)?;
        Ok(path)
    }
}
