//! Conversions between captured buffers, `image` buffers and OpenCV Mats.
//! `image` <-> Mat goes through opencv-match; only the strided BGRA copy is ours.

use crate::frame::BGRA_CHANNELS;
use crate::Result;
use anyhow::{ensure, Context};
use grazer_core::Rect;
use image::{DynamicImage, GrayImage, RgbaImage};
use opencv::{
    core::{self, Mat, Scalar, CV_8UC1, CV_8UC4},
    imgcodecs, imgproc,
    prelude::*,
};
use opencv_match::prelude::*;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Copy `rect` out of a strided BGRA buffer into a 4-channel Mat
    pub fn bgra_region_to_mat(data: &[u8], stride: usize, rect: Rect) -> Result<Mat> {
        ensure!(!rect.is_empty(), "empty region {:?}", rect);
        ensure!(rect.x >= 0 && rect.y >= 0, "region {:?} starts outside the buffer", rect);

        let row_len = rect.width as usize * BGRA_CHANNELS;
        let mut mat =
            Mat::new_rows_cols_with_default(rect.height, rect.width, CV_8UC4, Scalar::all(0.0))?;
        let dst = mat.data_bytes_mut()?;

        for row in 0..rect.height as usize {
            let start = (rect.y as usize + row) * stride + rect.x as usize * BGRA_CHANNELS;
            let src = data
                .get(start..start + row_len)
                .with_context(|| format!("Row {} of region {:?} is outside the buffer", row, rect))?;
            dst[row * row_len..(row + 1) * row_len].copy_from_slice(src);
        }

        Ok(mat)
    }

    /// BGRA Mat to single-channel luma
    pub fn bgra_to_grayscale(mat: &Mat) -> Result<Mat> {
        let mut gray = Mat::default();
        imgproc::cvt_color_def(mat, &mut gray, imgproc::COLOR_BGRA2GRAY)
            .context("Failed to convert BGRA to grayscale")?;
        Ok(gray)
    }

    /// Convert image::RgbaImage to OpenCV Mat using opencv-match
    pub fn rgba_to_mat(rgba_image: &RgbaImage) -> Result<Mat> {
        rgba_image
            .try_into_cv()
            .context("Failed to convert RGBA image to OpenCV Mat")
    }

    /// Convert OpenCV Mat to image::RgbaImage using opencv-match
    pub fn mat_to_rgba(mat: &Mat) -> Result<RgbaImage> {
        mat.try_into_cv()
            .context("Failed to convert OpenCV Mat to RGBA image")
    }

    /// Convert image::GrayImage to a single-channel Mat.
    /// Equal channels keep every luma value exact through the round trip.
    pub fn gray_image_to_mat(gray_image: &GrayImage) -> Result<Mat> {
        let rgba = DynamicImage::ImageLuma8(gray_image.clone()).to_rgba8();
        opencv_match::convert::mat_to_grayscale(&Self::rgba_to_mat(&rgba)?, true)
            .context("Failed to convert grayscale image to OpenCV Mat")
    }

    /// Convert a single-channel Mat to image::GrayImage
    pub fn mat_to_gray_image(mat: &Mat) -> Result<GrayImage> {
        ensure!(mat.typ() == CV_8UC1, "expected an 8-bit single-channel Mat");
        let mut rgba = Mat::default();
        imgproc::cvt_color_def(mat, &mut rgba, imgproc::COLOR_GRAY2RGBA)
            .context("Failed to expand grayscale Mat")?;
        Ok(DynamicImage::ImageRgba8(Self::mat_to_rgba(&rgba)?).to_luma8())
    }

    /// Load image as grayscale Mat using opencv-match
    pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgba8();

        opencv_match::convert::mat_to_grayscale(&img.try_into_cv()?, true)
            .context("Failed to convert image to grayscale")
    }

    /// Save Mat as image
    pub fn save_image<P: AsRef<Path>>(mat: &Mat, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();

        imgcodecs::imwrite(&path_str, mat, &core::Vector::new())
            .with_context(|| format!("Failed to save image: {}", path_str))?;

        Ok(())
    }
}
