//! Utility modules shared across the pipeline and the dev server.

pub mod html;
pub mod mime;
pub mod path;
pub mod plural;
