use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pk_core::Error;

/// Symlinks venv apps into the shared bin directory.
pub struct AppLinker {
    bin_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LinkedApp {
    pub name: String,
    pub link_path: PathBuf,
    pub target_path: PathBuf,
}

impl AppLinker {
    pub fn new(bin_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(bin_dir)?;
        Ok(Self {
            bin_dir: bin_dir.to_path_buf(),
        })
    }

    /// Link the named apps from a venv's bin directory.
    /// Returns the list of created links; apps missing from the venv are
    /// skipped. Errors on conflict with a file not owned by this venv unless
    /// `force` is set, in which case whatever is in the way is replaced.
    pub fn link_apps(
        &self,
        venv_bin: &Path,
        apps: &[String],
        force: bool,
    ) -> Result<Vec<LinkedApp>, Error> {
        let mut linked = Vec::new();

        for app in apps {
            let target_path = venv_bin.join(app);
            if !target_path.exists() {
                continue;
            }
            let link_path = self.bin_dir.join(app);

            if link_path.exists() || link_path.symlink_metadata().is_ok() {
                if let Ok(existing_target) = fs::read_link(&link_path) {
                    let existing_canonical = canonical_link_target(&link_path, &existing_target);
                    let target_canonical = fs::canonicalize(&target_path).ok();

                    if existing_canonical.is_some() && existing_canonical == target_canonical {
                        // Already linked to us, skip
                        linked.push(LinkedApp {
                            name: app.clone(),
                            link_path,
                            target_path,
                        });
                        continue;
                    }

                    // Broken symlinks are cleaned up; live foreign ones are a
                    // conflict unless forced.
                    if existing_canonical.is_some() && !force {
                        return Err(Error::LinkConflict { path: link_path });
                    }
                    fs::remove_file(&link_path).map_err(|e| {
                        Error::environment("failed to remove existing symlink", e)
                    })?;
                } else if force {
                    fs::remove_file(&link_path)
                        .map_err(|e| Error::environment("failed to remove existing file", e))?;
                } else {
                    // Not a symlink - a real file owns the name
                    return Err(Error::LinkConflict { path: link_path });
                }
            }

            #[cfg(unix)]
            std::os::unix::fs::symlink(&target_path, &link_path)
                .map_err(|e| Error::environment("failed to create symlink", e))?;

            #[cfg(not(unix))]
            return Err(Error::Environment {
                message: "symlinks not supported on this platform".to_string(),
            });

            linked.push(LinkedApp {
                name: app.clone(),
                link_path,
                target_path,
            });
        }

        Ok(linked)
    }

    /// Remove links for the named apps, but only those that point into the
    /// given venv bin directory.
    pub fn unlink_apps(&self, venv_bin: &Path, apps: &[String]) -> Result<Vec<PathBuf>, Error> {
        let mut unlinked = Vec::new();

        for app in apps {
            let target_path = venv_bin.join(app);
            let link_path = self.bin_dir.join(app);

            if let Ok(existing_target) = fs::read_link(&link_path) {
                let existing_canonical = canonical_link_target(&link_path, &existing_target);
                let target_canonical = fs::canonicalize(&target_path).ok();

                if existing_canonical.is_some() && existing_canonical == target_canonical {
                    fs::remove_file(&link_path)
                        .map_err(|e| Error::environment("failed to remove symlink", e))?;
                    unlinked.push(link_path);
                }
            }
        }

        Ok(unlinked)
    }

    /// Whether the named app is currently linked to the given venv.
    pub fn is_linked(&self, venv_bin: &Path, app: &str) -> bool {
        let link_path = self.bin_dir.join(app);
        let Ok(existing_target) = fs::read_link(&link_path) else {
            return false;
        };
        let existing_canonical = canonical_link_target(&link_path, &existing_target);
        let target_canonical = fs::canonicalize(venv_bin.join(app)).ok();
        existing_canonical.is_some() && existing_canonical == target_canonical
    }
}

/// Resolve a symlink target (possibly relative) to its canonical location.
fn canonical_link_target(link_path: &Path, target: &Path) -> Option<PathBuf> {
    let resolved = if target.is_relative() {
        link_path.parent().unwrap_or(Path::new("")).join(target)
    } else {
        target.to_path_buf()
    };
    fs::canonicalize(resolved).ok()
}
