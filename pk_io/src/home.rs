use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pk_core::Error;

/// Directory layout for pipkin state and linked apps.
///
/// The root (default `~/.pipkin`, override `PIPKIN_HOME`) holds `venvs/` and
/// `locks/`; apps are linked into a shared bin directory (default
/// `~/.local/bin`, override `PIPKIN_BIN_DIR`).
#[derive(Debug, Clone)]
pub struct Home {
    root: PathBuf,
    bin_dir: PathBuf,
}

impl Home {
    pub const ROOT_ENV: &'static str = "PIPKIN_HOME";
    pub const BIN_ENV: &'static str = "PIPKIN_BIN_DIR";

    pub fn from_env() -> Result<Self, Error> {
        let root = match env::var(Self::ROOT_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home_dir()?.join(".pipkin"),
        };
        let bin_dir = match env::var(Self::BIN_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home_dir()?.join(".local").join("bin"),
        };
        Ok(Self { root, bin_dir })
    }

    pub fn at(root: PathBuf, bin_dir: PathBuf) -> Self {
        Self { root, bin_dir }
    }

    pub fn venvs_dir(&self) -> PathBuf {
        self.root.join("venvs")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Create the directory tree on first use.
    pub fn ensure_dirs(&self) -> Result<(), Error> {
        for dir in [self.venvs_dir(), self.locks_dir(), self.bin_dir.clone()] {
            fs::create_dir_all(&dir)
                .map_err(|e| Error::environment(&format!("failed to create {}", dir.display()), e))?;
        }
        Ok(())
    }
}

fn home_dir() -> Result<PathBuf, Error> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| Error::Environment {
            message: "HOME not set".to_string(),
        })
}
