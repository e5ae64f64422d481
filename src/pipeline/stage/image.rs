//! Lossless-first image compression.
//!
//! PNG is re-encoded at the highest deflate level, JPEG at the configured
//! quality, SVG is rewritten by usvg without indentation. The smaller of the
//! original and the re-encoded bytes is kept, so the stage never grows a file.
//! Every other matched type (gif, webp, bmp, ico, mp4) passes through.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};

use super::Stage;
use crate::asset::FileEvent;
use crate::pipeline::StageError;
use crate::{debug, log};

/// usvg drops `<text>` nodes when no font database is loaded.
const SVG_TEXT: &str = "<text";

pub struct Compress {
    jpeg_quality: u8,
}

impl Compress {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }

    fn recompress(&self, ext: &str, data: &[u8]) -> Result<Option<Vec<u8>>, String> {
        match ext {
            "png" => compress_png(data).map(Some),
            "jpg" | "jpeg" => compress_jpeg(data, self.jpeg_quality).map(Some),
            "svg" => compress_svg(data),
            _ => Ok(None),
        }
    }
}

fn compress_png(data: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).map_err(|e| e.to_string())?;
    Ok(out)
}

fn compress_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

fn compress_svg(data: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
    if text.contains(SVG_TEXT) {
        return Ok(None);
    }
    let tree = usvg::Tree::from_data(data, &usvg::Options::default()).map_err(|e| e.to_string())?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    Ok(Some(tree.to_string(&write_options).into_bytes()))
}

impl Stage for Compress {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let Some(ext) = event.extension() else {
            return Ok(vec![event]);
        };

        match self.recompress(&ext, &event.contents) {
            Ok(Some(smaller)) if smaller.len() < event.contents.len() => {
                debug!(
                    "images";
                    "{}: {} -> {} bytes",
                    event.path,
                    event.contents.len(),
                    smaller.len()
                );
                Ok(vec![event.with_contents(smaller)])
            }
            Ok(_) => Ok(vec![event]),
            Err(e) => {
                // Undecodable images are still copied.
                log!("images"; "{}: kept original, {e}", event.path);
                Ok(vec![event])
            }
        }
    }
}
