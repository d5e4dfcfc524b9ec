use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

use super::extract::{materialize, EntryKind};
use super::path::stripped_destination;

/// Extract a zip archive into `dest_dir` with the top-level component stripped.
pub(crate) fn extract_zip_stripped(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)?;
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let raw_name = entry.name().to_string();

        if entry.is_symlink() {
            log::warn!("Skipping symlink entry {:?}", raw_name);
            continue;
        }

        let Some(out_path) = stripped_destination(dest_dir, &raw_name)? else {
            continue;
        };

        let kind = if entry.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File {
                size: entry.size(),
                mode: entry.unix_mode(),
            }
        };
        materialize(&out_path, kind, &mut entry)
            .map_err(|e| AppError::archive(format!("{raw_name}: {e}")))?;
    }

    Ok(())
}
