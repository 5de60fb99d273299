//! Export-file discovery by glob pattern.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use harvester_shared::{HarvestError, Result};

/// List files in `dir` matching a glob-style `pattern` (e.g.
/// `ComBaseExport*.xlsx`).
///
/// Order is filesystem-dependent; callers must not rely on it beyond "every
/// matching file appears exactly once". An empty result is not an error —
/// the caller decides whether no matches means "nothing to do".
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let paths = glob::glob(&full_pattern).map_err(|e| {
        HarvestError::validation(format!("bad file pattern '{pattern}': {e}"))
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => files.push(path),
            // An unreadable directory entry is skippable, not fatal.
            Err(e) => warn!(error = %e, "skipping unreadable entry during discovery"),
        }
    }

    debug!(dir = %dir.display(), pattern, count = files.len(), "discovery complete");
    Ok(files)
}
