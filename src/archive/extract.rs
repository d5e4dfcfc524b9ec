use std::fs;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use crate::error::{AppError, Result};

/// What an archive entry turns into on disk.
#[derive(Debug, Clone, Copy)]
pub(super) enum EntryKind {
    Dir,
    /// Regular file with its declared size and unix mode, if recorded.
    File { size: u64, mode: Option<u32> },
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| AppError::io(format!("failed to create directory {}: {e}", path.display())))
}

/// Permission bits without setuid, setgid or sticky.
#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| AppError::io(format!("failed to chmod {}: {e}", path.display())))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Write one entry below its already validated destination.
pub(super) fn materialize<R: io::Read>(out_path: &Path, kind: EntryKind, reader: &mut R) -> Result<()> {
    let EntryKind::File { size, mode } = kind else {
        return create_dir(out_path);
    };

    if let Some(parent) = out_path.parent() {
        create_dir(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(out_path)?);
    let written = io::copy(reader, &mut writer)?;
    writer.flush()?;
    if written != size {
        return Err(AppError::archive(format!(
            "{} is truncated: {written} of {size} bytes",
            out_path.display()
        )));
    }
    if let Some(mode) = mode {
        apply_mode(out_path, mode)?;
    }
    Ok(())
}
