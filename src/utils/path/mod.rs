//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`) and
//!   relative forward-slash paths (`to_slash`, `rel_slash`)

pub mod fs;

pub use fs::{normalize_path, rel_slash};
