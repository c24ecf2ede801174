use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Number of shutdown reports kept in the cache directory, new one included.
pub const MAX_RETAINED_REPORTS: usize = 10;

/// Regular files in `dir`, oldest modification time first.
pub fn files_by_age(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }

    // Name breaks ties so equal mtimes evict deterministically
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Delete the oldest files until at most `keep` remain. Returns what was removed.
///
/// A file that cannot be deleted is logged and skipped.
pub fn remove_old_files_in(dir: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    let files = files_by_age(dir)?;
    let excess = files.len().saturating_sub(keep);

    let mut removed = Vec::with_capacity(excess);
    for path in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed old report {:?}", path);
                removed.push(path);
            }
            Err(e) => warn!("Could not remove old report {:?}: {}", path, e),
        }
    }
    Ok(removed)
}
