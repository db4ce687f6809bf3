use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::process::Command;

use pk_core::{Error, VenvMetadata};

/// Name of the metadata document inside each venv directory.
pub const METADATA_FILE: &str = "pipkin_metadata.json";

/// All venvs managed by pipkin, under one directory.
#[derive(Debug, Clone)]
pub struct VenvContainer {
    venvs_dir: PathBuf,
}

impl VenvContainer {
    pub fn new(venvs_dir: PathBuf) -> Self {
        Self { venvs_dir }
    }

    pub fn venv(&self, name: &str) -> Venv {
        Venv::new(self.venvs_dir.join(name))
    }

    /// Venv directories in sorted order. `list` and `freeze` depend on the
    /// ordering being deterministic.
    pub fn iter_venvs(&self) -> Vec<Venv> {
        let mut dirs: Vec<PathBuf> = match fs::read_dir(&self.venvs_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        };
        dirs.sort();
        dirs.into_iter().map(Venv::new).collect()
    }
}

/// One virtual environment directory.
#[derive(Debug, Clone)]
pub struct Venv {
    dir: PathBuf,
}

impl Venv {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// A directory only counts as a venv once the interpreter has written its
    /// marker file.
    pub fn exists(&self) -> bool {
        self.dir.join("pyvenv.cfg").exists()
    }

    pub fn python_path(&self) -> PathBuf {
        #[cfg(windows)]
        {
            self.dir.join("Scripts").join("python.exe")
        }
        #[cfg(not(windows))]
        {
            self.dir.join("bin").join("python")
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        #[cfg(windows)]
        {
            self.dir.join("Scripts")
        }
        #[cfg(not(windows))]
        {
            self.dir.join("bin")
        }
    }

    /// Create the venv with `python -m venv`.
    pub async fn create(&self, python: &str) -> Result<(), Error> {
        debug!("creating venv at {} with {python}", self.dir.display());
        let output = Command::new(python)
            .arg("-m")
            .arg("venv")
            .arg(&self.dir)
            .output()
            .await
            .map_err(|e| Error::VenvCreation {
                message: format!("failed to run {python}: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("no error output");
            return Err(Error::VenvCreation {
                message: format!("{python} -m venv exited with {}: {detail}", output.status),
            });
        }
        Ok(())
    }

    pub fn has_metadata(&self) -> bool {
        self.dir.join(METADATA_FILE).exists()
    }

    pub fn load_metadata(&self) -> Result<VenvMetadata, Error> {
        let path = self.dir.join(METADATA_FILE);
        let raw = fs::read_to_string(&path).map_err(|_| Error::MissingMetadata {
            name: self.name(),
        })?;
        serde_json::from_str(&raw).map_err(|_| Error::MissingMetadata { name: self.name() })
    }

    /// Write the metadata document atomically (temp file, then rename).
    pub fn save_metadata(&self, metadata: &VenvMetadata) -> Result<(), Error> {
        let path = self.dir.join(METADATA_FILE);
        let tmp = self.dir.join(format!("{METADATA_FILE}.tmp"));
        let raw = serde_json::to_string_pretty(metadata)
            .map_err(|e| Error::environment("failed to serialize metadata", e))?;
        fs::write(&tmp, raw)
            .map_err(|e| Error::environment(&format!("failed to write {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::environment(&format!("failed to write {}", path.display()), e))?;
        Ok(())
    }

    /// Remove the venv directory entirely. A no-op if it is already gone.
    pub fn remove(&self) -> Result<(), Error> {
        if !self.dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&self.dir)
            .map_err(|e| Error::environment(&format!("failed to remove {}", self.dir.display()), e))
    }

    /// Names currently present in the venv's bin directory.
    pub fn bin_entries(&self) -> BTreeSet<String> {
        match fs::read_dir(self.bin_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }
}

/// Executables that appeared in the venv bin directory during a pip run are
/// taken to be the installed package's apps.
pub fn new_apps(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Vec<String> {
    after.difference(before).cloned().collect()
}
