//! On-disk naming for the dataset tree.
//!
//! ```text
//! <root>/<label>/<index>/keypoints.npy    consolidated (L x K)
//! <root>/<label>/<index>/<frame>.npy      legacy, one per frame (K)
//! <root>/<label>/<index>/preview.jpg      optional thumbnail
//! ```

use super::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the consolidated sequence array.
pub const CONSOLIDATED_FILE: &str = "keypoints.npy";

/// File name of the optional preview thumbnail.
pub const PREVIEW_FILE: &str = "preview.jpg";

/// File name of legacy frame `frame`.
pub fn frame_file(frame: usize) -> String {
    format!("{}.npy", frame)
}

/// Hidden directory a new sequence is assembled in before it appears.
pub fn staging_dir_name(index: u32) -> String {
    format!(".{}.staging-{}", index, std::process::id())
}

/// Whether `name` is a staging directory left by a process other than this one.
pub fn is_stale_staging(name: &str) -> bool {
    let Some(rest) = name.strip_prefix('.') else {
        return false;
    };
    let Some((index, pid)) = rest.split_once(".staging-") else {
        return false;
    };
    parse_index(index).is_some()
        && pid
            .parse::<u32>()
            .map_or(false, |pid| pid != std::process::id())
}

/// Parses a directory name as a sequence index.
///
/// Only canonical decimal names count: `"7"` is index 7, `"07"` and
/// staging directories are ignored.
pub fn parse_index(name: &str) -> Option<u32> {
    name.parse::<u32>()
        .ok()
        .filter(|index| index.to_string() == name)
}

/// Rejects names that would escape the dataset root or hide from listing.
pub fn validate_label(label: &str) -> Result<(), StoreError> {
    let reason = if label.trim().is_empty() {
        Some("label is empty")
    } else if label.starts_with('.') {
        Some("label may not start with '.'")
    } else if label.contains(['/', '\\', '\0']) {
        Some("label may not contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidLabel {
            label: label.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes `bytes` to `path` through a sibling temp file and a rename.
///
/// Readers either see the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));

    let result: std::io::Result<()> = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::io(path, source)
    })
}

/// Lists immediate subdirectories of `dir` by name.
///
/// A missing directory lists as empty.
pub fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    Ok(dirs)
}
