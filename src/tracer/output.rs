use std::path::Path;

use bytemuck::cast_slice;
use image::{ImageResult, RgbaImage};

/// Tone-mapped output of the tracer, one packed RGBA8 value per pixel.
///
/// Row 0 is the bottom of the viewport, matching the camera's ray table.
#[derive(Debug, Clone, Default)]
pub struct FinalImage {
    width: u32,
    height: u32,
    pub(crate) pixels: Vec<u32>,
}

impl FinalImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// RGBA bytes in the same row order as [`FinalImage::pixels`].
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.pixels)
    }

    /// Copies into an `image` buffer with row 0 at the top, as image files expect.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let row = (self.width * 4) as usize;
        let mut flipped = Vec::with_capacity(self.as_bytes().len());
        if row > 0 {
            for line in self.as_bytes().chunks_exact(row).rev() {
                flipped.extend_from_slice(line);
            }
        }

        // 크기는 pixels 길이와 항상 같음
        RgbaImage::from_raw(self.width, self.height, flipped)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_rgba_image()
            .save_with_format(path, image::ImageFormat::Png)
    }
}
