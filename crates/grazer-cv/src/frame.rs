//! Captured frames and the grayscale playfield cut out of them

use crate::utils::ImageUtils;
use crate::Result;
use anyhow::{ensure, Context};
use grazer_core::{CaptureBox, Rect, RoiExtents, Vec2};
use image::{imageops, GrayImage, SubImage};
use opencv::core::Mat;
use std::time::Duration;
use thiserror::Error;

/// Bytes per BGRA pixel.
pub const BGRA_CHANNELS: usize = 4;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no frame within {0:?}")]
    Timeout(Duration),

    #[error("capture source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// One captured frame, BGRA with 8 bits per channel.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a raw buffer; `stride` is the byte length of one row including padding.
    pub fn new(width: u32, height: u32, stride: usize, data: Vec<u8>) -> std::result::Result<Self, CaptureError> {
        let min_stride = width as usize * BGRA_CHANNELS;
        if stride < min_stride {
            return Err(CaptureError::Malformed(format!(
                "stride {stride} shorter than {width} BGRA pixels"
            )));
        }
        let needed = stride * height as usize;
        if data.len() < needed {
            return Err(CaptureError::Malformed(format!(
                "buffer holds {} bytes, {width}x{height} at stride {stride} needs {needed}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Tightly packed buffer.
    pub fn from_bgra(width: u32, height: u32, data: Vec<u8>) -> std::result::Result<Self, CaptureError> {
        Self::new(width, height, width as usize * BGRA_CHANNELS, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// BGRA bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = y as usize * self.stride + x as usize * BGRA_CHANNELS;
        let px = self.data.get(at..at + BGRA_CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// The capture box cut out of a frame, in game space.
///
/// Holds the color pixels for annotation and a grayscale copy for detection.
/// Regions are handed out as immutable views; nothing here carries a "current ROI".
pub struct Playfield {
    capture_box: CaptureBox,
    color: Mat,
    gray: GrayImage,
}

impl Playfield {
    pub fn extract(frame: &Frame, capture_box: &CaptureBox) -> Result<Self> {
        let rect = capture_box.frame_rect();
        ensure!(!rect.is_empty(), "capture box is empty");
        ensure!(
            frame.bounds().contains_rect(&rect),
            "capture box {:?} does not fit in a {}x{} frame",
            rect,
            frame.width(),
            frame.height()
        );

        let color = ImageUtils::bgra_region_to_mat(frame.data(), frame.stride(), rect)
            .context("Failed to copy playfield out of frame")?;
        let gray_mat = ImageUtils::bgra_to_grayscale(&color)?;
        let gray = ImageUtils::mat_to_gray_image(&gray_mat)?;

        Ok(Self {
            capture_box: *capture_box,
            color,
            gray,
        })
    }

    pub fn capture_box(&self) -> &CaptureBox {
        &self.capture_box
    }

    /// Game-space bounds.
    pub fn bounds(&self) -> Rect {
        self.capture_box.bounds()
    }

    pub fn color(&self) -> &Mat {
        &self.color
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Region of interest around a game-space point, clipped to the playfield.
    pub fn roi(&self, center: Vec2, extents: RoiExtents) -> Rect {
        self.capture_box.roi(center, extents)
    }

    /// Read-only view of `rect`, which is clipped to the playfield first.
    pub fn region(&self, rect: Rect) -> RegionView<'_> {
        let rect = rect.clip_to(self.bounds());
        let view = imageops::crop_imm(
            &self.gray,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        );
        RegionView { rect, view }
    }
}

/// A rectangle of the grayscale playfield plus where it sits in game space.
pub struct RegionView<'a> {
    rect: Rect,
    view: SubImage<&'a GrayImage>,
}

impl RegionView<'_> {
    /// Placement in game space; detections inside are local to its origin.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn width(&self) -> i32 {
        self.rect.width
    }

    pub fn height(&self) -> i32 {
        self.rect.height
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    pub fn to_image(&self) -> GrayImage {
        self.view.to_image()
    }

    /// Owned single-channel copy for OpenCV.
    pub fn to_mat(&self) -> Result<Mat> {
        ImageUtils::gray_image_to_mat(&self.to_image())
    }
}
