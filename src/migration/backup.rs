// Relocation of migrated sources into backup folders (move, never delete)

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::MAX_UNIQUE_SUFFIX;
use crate::error::{MigrationError, Result};
use crate::hash::compute_full_hash;

/// Move `source` into `backup_dir`, keeping its file name. A clash with an
/// existing backup gets a numeric suffix. Returns the new location.
pub fn move_file_to_dir(source: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir)?;

    let filename = source
        .file_name()
        .ok_or_else(|| MigrationError::InvalidPath(format!("No filename: {}", source.display())))?;

    let mut dest_path = backup_dir.join(filename);
    if dest_path.exists() {
        dest_path = next_free_backup_name(&dest_path)?;
    }

    move_file(source, &dest_path)?;
    Ok(dest_path)
}

/// Move the directory `source` to `dest`, replacing whatever is at `dest`.
pub fn move_dir_replacing(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(MigrationError::InvalidPath(format!(
            "Source is not a directory: {}",
            source.display()
        )));
    }

    if dest.exists() {
        log::info!("Replacing previous backup {}", dest.display());
        if dest.is_dir() {
            fs::remove_dir_all(dest)?;
        } else {
            fs::remove_file(dest)?;
        }
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Err(e) = fs::rename(source, dest) {
        log::debug!("Rename of {} failed ({}), copying instead", source.display(), e);
        copy_database_folder(source, dest)?;
        fs::remove_dir_all(source)?;
    }
    Ok(())
}

fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, dest) {
        // Typically a move across filesystems
        log::debug!("Rename of {} failed ({}), copying instead", source.display(), e);
        copy_with_verify(source, dest)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

/// First free `<stem>_<n>.<ext>` next to an existing backup
fn next_free_backup_name(taken: &Path) -> Result<PathBuf> {
    let dir = taken.parent().unwrap_or(Path::new("."));
    let stem = taken.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let suffix = taken
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..MAX_UNIQUE_SUFFIX)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, suffix)))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            MigrationError::Backup(format!(
                "Backup folder already holds {} copies of {}",
                MAX_UNIQUE_SUFFIX - 1,
                taken.display()
            ))
        })
}

/// Copy file with read-back verification
fn copy_with_verify(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest)?;

    let source_hash = compute_full_hash(source)?;
    let dest_hash = compute_full_hash(dest)?;
    if source_hash != dest_hash {
        // Remove failed copy
        let _ = fs::remove_file(dest);
        return Err(MigrationError::Backup(format!(
            "Verification failed for {}: hash mismatch",
            dest.display()
        )));
    }

    // Preserve modification time
    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified));
    }

    Ok(())
}

/// Copy a legacy database folder file by file when it cannot be renamed
fn copy_database_folder(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| MigrationError::Backup(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| MigrationError::Backup(e.to_string()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_with_verify(entry.path(), &target)?;
        }
    }
    Ok(())
}
