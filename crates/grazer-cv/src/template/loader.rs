//! Template loading utilities

use super::Template;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::{ensure, Context};
use image::GrayImage;
use opencv::prelude::*;
use std::path::{Path, PathBuf};

/// Finds reference images by name across a list of directories
pub struct TemplateLoader {
    template_dirs: Vec<PathBuf>,
    supported_extensions: Vec<String>,
}

impl TemplateLoader {
    pub fn new() -> Self {
        Self {
            template_dirs: Vec::new(),
            supported_extensions: vec!["png".to_string(), "bmp".to_string()],
        }
    }

    /// Add template directory
    pub fn add_template_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.template_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Load template by name, trying each directory and extension in order
    pub fn load_template(&self, name: &str) -> Result<Option<Template>> {
        for dir in &self.template_dirs {
            for ext in &self.supported_extensions {
                let path = dir.join(format!("{}.{}", name, ext));
                if path.is_file() {
                    return Self::load_file(&path).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Load a single template file; the name is the file stem
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Template> {
        let path = path.as_ref();
        let image = ImageUtils::load_grayscale(path)
            .with_context(|| format!("Failed to load template: {:?}", path))?;
        ensure!(
            image.rows() > 0 && image.cols() > 0,
            "template {:?} is empty",
            path
        );

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());
        Ok(Template::new(name, image))
    }

    /// Build a template from an in-memory grayscale image
    pub fn from_gray(name: &str, image: &GrayImage) -> Result<Template> {
        ensure!(image.width() > 0 && image.height() > 0, "template {} is empty", name);
        Ok(Template::new(name.to_string(), ImageUtils::gray_image_to_mat(image)?))
    }
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_load_template_searches_dirs() -> Result<()> {
        let empty = tempfile::tempdir()?;
        let assets = tempfile::tempdir()?;
        RgbaImage::from_pixel(6, 4, Rgba([200, 40, 40, 255])).save(assets.path().join("power.png"))?;

        let loader = TemplateLoader::new()
            .add_template_dir(empty.path())
            .add_template_dir(assets.path());

        let template = loader.load_template("power")?.expect("template should be found");
        assert_eq!(template.name, "power");
        assert_eq!((template.width(), template.height()), (6, 4));
        assert!(loader.load_template("point")?.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_gray_image_is_rejected() {
        assert!(TemplateLoader::from_gray("x", &GrayImage::new(0, 0)).is_err());
    }
}
