//! `[images]` section configuration.
//!
//! ```toml
//! [images]
//! pattern = "**/*.{jpg,jpeg,png,gif,mp4,svg,webp,bmp,ico}"
//! jpeg_quality = 82
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::config::util::check_glob;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub enable: bool,
    pub pattern: String,
    /// JPEG re-encode quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enable: true,
            pattern: "**/*.{jpg,jpeg,png,gif,mp4,svg,webp,bmp,ico}".to_string(),
            jpeg_quality: 82,
        }
    }
}

impl ImagesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_glob(diag, "images.pattern", &self.pattern);
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(
                "images.jpeg_quality",
                format!("must be between 1 and 100, got {}", self.jpeg_quality),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_images_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.images.jpeg_quality, 82);
        assert!(config.images.pattern.contains("bmp"));
    }

    #[test]
    fn test_images_quality_range() {
        let config = test_parse_config("[images]\njpeg_quality = 0");
        let mut diag = ConfigDiagnostics::new();
        config.images.validate(&mut diag);
        assert_eq!(diag.errors()[0].field, "images.jpeg_quality");
    }
}
