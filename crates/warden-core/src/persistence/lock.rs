//! Advisory file locking for the settings document.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::policy::PolicyError;

/// RAII guard that holds an exclusive lock on `<document>.lock`.
///
/// The lock file is never removed; waiters must all lock the same inode.
pub struct DocumentLock {
    file: File,
    path: PathBuf,
}

impl DocumentLock {
    /// Block until the exclusive lock next to `document` is held.
    pub fn acquire(document: &Path) -> Result<Self, PolicyError> {
        let path = lock_path(document);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| PolicyError::Lock {
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive().map_err(|source| PolicyError::Lock {
            path: path.clone(),
            source,
        })?;

        log::debug!("Acquired approvals lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        // Spelled out so std's inherent File::unlock is not picked instead.
        let _ = <File as FileExt>::unlock(&self.file);
        log::debug!("Released approvals lock {}", self.path.display());
    }
}

fn lock_path(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    document.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_file_sits_next_to_document() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("settings.json");
        let lock = DocumentLock::acquire(&doc).unwrap();
        assert_eq!(lock.path(), dir.path().join("settings.json.lock"));
        assert!(lock.path().exists());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("settings.json");
        drop(DocumentLock::acquire(&doc).unwrap());

        let file = OpenOptions::new()
            .write(true)
            .open(dir.path().join("settings.json.lock"))
            .unwrap();
        file.try_lock_exclusive().unwrap();
    }

    #[test]
    fn held_lock_blocks_other_handles() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("settings.json");
        let _held = DocumentLock::acquire(&doc).unwrap();

        let other = OpenOptions::new()
            .write(true)
            .open(dir.path().join("settings.json.lock"))
            .unwrap();
        assert!(other.try_lock_exclusive().is_err());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("nested").join("settings.json");
        let lock = DocumentLock::acquire(&doc).unwrap();
        assert!(lock.path().exists());
    }
}
