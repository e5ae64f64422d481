//! Process-wide state shared by the dev server, the watch actors and the
//! pipeline.

mod state;
mod written;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
pub use written::{is_own_write, is_recorded, record_write};
