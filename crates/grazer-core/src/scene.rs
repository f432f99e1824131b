//! Per-tick detections handed from the vision stage to the force model.

use crate::geometry::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A connected group of bright pixels, one candidate projectile.
///
/// Contour points and bounds are local to the region of interest the blob was found in.
/// Blobs are rebuilt every tick; nothing links a blob to one from an earlier frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Pixel count of the component.
    pub area: u32,
    pub contour: Vec<Point>,
    pub bounds: Rect,
}

impl Blob {
    /// Closest contour point to `target`, in the parent space of `roi`, with its squared
    /// distance. Scans every contour point.
    pub fn nearest_point(&self, roi: Rect, target: Vec2) -> Option<(Vec2, f64)> {
        let mut best: Option<(Vec2, f64)> = None;
        for &local in &self.contour {
            let point = roi.to_parent(local).to_vec2();
            let dist_sq = point.distance_sq(target);
            if best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((point, dist_sq));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_point_uses_roi_offset() {
        let blob = Blob {
            area: 25,
            contour: vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)],
            bounds: Rect::new(0, 0, 5, 5),
        };
        let roi = Rect::new(100, 50, 40, 40);
        let (point, dist_sq) = blob.nearest_point(roi, Vec2::new(90.0, 52.0)).unwrap();
        assert_eq!(point, Vec2::new(100.0, 50.0));
        assert_eq!(dist_sq, 104.0);
    }

    #[test]
    fn test_empty_contour_has_no_nearest_point() {
        let blob = Blob {
            area: 0,
            contour: Vec::new(),
            bounds: Rect::default(),
        };
        assert!(blob.nearest_point(Rect::default(), Vec2::ZERO).is_none());
    }
}
