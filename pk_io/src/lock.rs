use std::fs::{self, File};
use std::path::Path;

use fs4::fs_std::FileExt;

use pk_core::Error;

/// Advisory file lock serializing mutations of one venv.
///
/// Held for the duration of any install/inject/uninstall so two pipkin
/// processes cannot interleave work on the same environment. Released on
/// drop.
pub struct InstallLock {
    file: File,
}

impl InstallLock {
    /// Block until the named lock is held.
    pub fn acquire(locks_dir: &Path, name: &str) -> Result<Self, Error> {
        fs::create_dir_all(locks_dir)
            .map_err(|e| Error::environment("failed to create locks directory", e))?;
        let path = locks_dir.join(format!("{name}.lock"));
        let file = File::create(&path)
            .map_err(|e| Error::environment(&format!("failed to open lock {}", path.display()), e))?;
        file.lock_exclusive()
            .map_err(|e| Error::environment(&format!("failed to lock {}", path.display()), e))?;
        Ok(Self { file })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let tmp = TempDir::new().unwrap();

        let lock = InstallLock::acquire(tmp.path(), "black").unwrap();
        drop(lock);
        let _again = InstallLock::acquire(tmp.path(), "black").unwrap();
    }

    #[test]
    fn distinct_names_do_not_contend() {
        let tmp = TempDir::new().unwrap();

        let _a = InstallLock::acquire(tmp.path(), "black").unwrap();
        let _b = InstallLock::acquire(tmp.path(), "ruff").unwrap();
    }
}
