//! `[fonts]` section configuration.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::config::util::check_glob;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub enable: bool,
    pub pattern: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            pattern: "**/*.{woff,woff2,ttf,otf,eot}".to_string(),
        }
    }
}

impl FontsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_glob(diag, "fonts.pattern", &self.pattern);
    }
}
