//! Configuration section definitions.
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[path]`    | Source and destination roots                     |
//! | `[serve]`   | Dev server listener and reload channel           |
//! | `[watch]`   | Debounce window and reload-only globs            |
//! | `[scripts]` | Script transpile and static analysis             |
//! | `[styles]`  | SCSS compile, prefixing and style lint           |
//! | `[images]`  | Image recompression                              |
//! | `[fonts]`   | Font copying                                     |

mod fonts;
mod images;
mod lint;
mod path;
mod scripts;
mod serve;
mod styles;
mod watch;

pub use fonts::FontsConfig;
pub use images::ImagesConfig;
pub use lint::{LintLevel, RuleLevels};
pub use path::PathConfig;
pub use scripts::{ScriptLintConfig, ScriptsConfig};
pub use serve::ServeConfig;
pub use styles::{StyleLintConfig, StylesConfig};
pub use watch::WatchConfig;
