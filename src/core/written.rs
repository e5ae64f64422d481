//! Files the pipeline wrote itself.
//!
//! `Dest` records the digest of every file before writing it. Once the
//! debounce window closes, the watcher drops changes to files that still
//! hold the recorded content, so a lint fix written back into the source
//! tree does not start another run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

static WRITTEN: LazyLock<Mutex<FxHashMap<PathBuf, blake3::Hash>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// Remember that `contents` was just written to `path`.
pub fn record_write(path: &Path, contents: &[u8]) {
    WRITTEN
        .lock()
        .insert(path.to_path_buf(), blake3::hash(contents));
}

/// Whether the pipeline has written `path` and the record still stands.
pub fn is_recorded(path: &Path) -> bool {
    WRITTEN.lock().contains_key(path)
}

/// Whether `path` still holds what the pipeline wrote there.
///
/// Any other content (or a missing file) forgets the record.
pub fn is_own_write(path: &Path) -> bool {
    let mut written = WRITTEN.lock();
    let Some(recorded) = written.get(path).copied() else {
        return false;
    };
    let current = fs::read(path).ok().map(|bytes| blake3::hash(&bytes));
    if current == Some(recorded) {
        return true;
    }
    written.remove(path);
    false
}
