use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

fn has_windows_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Convert an archive entry path to a relative PathBuf, rejecting absolute or traversal paths.
pub(super) fn parse_entry_rel_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') || has_windows_drive_prefix(&normalized) {
        return None;
    }

    let mut relative = PathBuf::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            _ => relative.push(part),
        }
    }

    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative)
}

/// Drop the first component. `None` for the top-level entry itself.
pub(super) fn strip_top_component(relative: &Path) -> Option<PathBuf> {
    let mut components = relative.components();
    components.next()?;
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest.to_path_buf())
    }
}

/// Map a raw entry name to its destination, or `None` if the entry is the stripped root.
pub(super) fn stripped_destination(dest_dir: &Path, raw: &str) -> Result<Option<PathBuf>> {
    let relative = parse_entry_rel_path(raw)
        .ok_or_else(|| AppError::archive(format!("archive contains unsafe entry path: {raw:?}")))?;
    Ok(strip_top_component(&relative).map(|rest| dest_dir.join(rest)))
}
