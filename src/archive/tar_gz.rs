use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

use super::extract::{materialize, EntryKind};
use super::path::stripped_destination;

/// Extract a tar.gz archive into `dest_dir` with the top-level component stripped.
///
/// Links and special files are skipped.
pub(crate) fn extract_tar_gz_stripped(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)?;
    let file = fs::File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    for entry in archive
        .entries()
        .map_err(|e| AppError::archive(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| AppError::archive(e.to_string()))?;

        let raw_path = {
            let entry_path = entry.path().map_err(|e| AppError::archive(e.to_string()))?;
            entry_path
                .to_str()
                .ok_or_else(|| {
                    AppError::archive(format!(
                        "archive entry path is not valid UTF-8: {:?}",
                        entry_path
                    ))
                })?
                .to_string()
        };

        let entry_type = entry.header().entry_type();
        if !entry_type.is_dir() && !entry_type.is_file() {
            if !matches!(
                entry_type,
                tar::EntryType::XGlobalHeader | tar::EntryType::XHeader
            ) {
                log::warn!("Skipping {:?} entry {:?}", entry_type, raw_path);
            }
            continue;
        }

        let Some(out_path) = stripped_destination(dest_dir, &raw_path)? else {
            continue;
        };

        let kind = if entry_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File {
                size: entry
                    .header()
                    .size()
                    .map_err(|e| AppError::archive(e.to_string()))?,
                mode: entry.header().mode().ok(),
            }
        };
        materialize(&out_path, kind, &mut entry)?;
    }

    Ok(())
}
