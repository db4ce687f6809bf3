use std::path::Path;

use pk_core::{
    Error, InstallTracker, PackageMetadata, ProgressSink, VenvMetadata, package_name_from_spec,
};

use crate::home::Home;
use crate::link::AppLinker;
use crate::lock::InstallLock;
use crate::phase::{InstallPhase, PhaseCallback};
use crate::pip::{pip_install_command, run_streaming};
use crate::venv::{Venv, VenvContainer, new_apps};

pub struct Installer {
    home: Home,
    container: VenvContainer,
    linker: AppLinker,
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub python: String,
    pub pip_args: Vec<String>,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub pip_args: Vec<String>,
    pub include_apps: bool,
    pub include_dependencies: bool,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub package: String,
    pub apps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InjectReport {
    pub package: String,
    pub venv: String,
    pub apps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UninstallReport {
    pub name: String,
    pub unlinked: usize,
}

impl Installer {
    pub fn new(home: Home) -> Result<Self, Error> {
        home.ensure_dirs()?;
        let linker = AppLinker::new(home.bin_dir())
            .map_err(|e| Error::environment("failed to prepare bin directory", e))?;
        let container = VenvContainer::new(home.venvs_dir());
        Ok(Self {
            home,
            container,
            linker,
        })
    }

    pub fn home(&self) -> &Home {
        &self.home
    }

    pub fn container(&self) -> &VenvContainer {
        &self.container
    }

    /// Install `spec` into its own venv and link its apps onto PATH.
    ///
    /// The tracker renders pip's output live; `on_phase` reports the coarse
    /// steps around it.
    pub async fn install<S: ProgressSink>(
        &self,
        spec: &str,
        options: &InstallOptions,
        tracker: &mut InstallTracker<S>,
        on_phase: Option<&PhaseCallback>,
    ) -> Result<InstallReport, Error> {
        let name = package_name_from_spec(spec)?;
        let venv = self.container.venv(&name);
        let _lock = InstallLock::acquire(&self.home.locks_dir(), &name)?;

        if venv.has_metadata() && !options.force {
            return Err(Error::AlreadyInstalled { name });
        }
        if venv.exists() || venv.has_metadata() {
            // Forced reinstall: drop the old links before the venv goes away.
            if let Ok(old) = venv.load_metadata() {
                let apps = owned(&old.linked_apps());
                self.linker.unlink_apps(&venv.bin_dir(), &apps)?;
            }
            venv.remove()?;
        }

        emit(on_phase, InstallPhase::CreatingVenv { name: name.clone() });
        let created = venv.create(&options.python).await;
        emit(on_phase, InstallPhase::VenvReady { name: name.clone() });
        created?;

        emit(on_phase, InstallPhase::RunningPip { name: name.clone() });
        let before = venv.bin_entries();
        let cmd = pip_install_command(&venv.python_path(), &options.pip_args, spec);
        let outcome = run_streaming(cmd, tracker).await?;
        if !outcome.success {
            // Leave no half-installed venv behind.
            let _ = venv.remove();
            return Err(Error::PipFailed {
                tail: outcome.tail(),
                status: outcome.status,
            });
        }

        let apps = new_apps(&before, &venv.bin_entries());
        let metadata = VenvMetadata::new(PackageMetadata {
            package: name.clone(),
            package_or_url: spec.to_string(),
            pip_args: options.pip_args.clone(),
            include_apps: true,
            include_dependencies: false,
            apps: apps.clone(),
        });
        venv.save_metadata(&metadata)?;

        let linked = self.linker.link_apps(&venv.bin_dir(), &apps, options.force)?;
        let linked: Vec<String> = linked.into_iter().map(|l| l.name).collect();
        emit(
            on_phase,
            InstallPhase::Linked {
                name: name.clone(),
                apps: linked.clone(),
            },
        );

        Ok(InstallReport {
            package: name,
            apps: linked,
        })
    }

    /// Install `spec` into an existing venv and record it as injected.
    pub async fn inject<S: ProgressSink>(
        &self,
        venv_name: &str,
        spec: &str,
        options: &InjectOptions,
        tracker: &mut InstallTracker<S>,
    ) -> Result<InjectReport, Error> {
        let venv = self.container.venv(venv_name);
        if !venv.exists() {
            return Err(Error::MissingVenv {
                name: venv_name.to_string(),
            });
        }
        let mut metadata = venv.load_metadata()?;
        let name = package_name_from_spec(spec)?;
        let _lock = InstallLock::acquire(&self.home.locks_dir(), venv_name)?;

        let before = venv.bin_entries();
        let cmd = pip_install_command(&venv.python_path(), &options.pip_args, spec);
        let outcome = run_streaming(cmd, tracker).await?;
        if !outcome.success {
            return Err(Error::PipFailed {
                tail: outcome.tail(),
                status: outcome.status,
            });
        }

        let apps = new_apps(&before, &venv.bin_entries());
        metadata.merge_injected(PackageMetadata {
            package: name.clone(),
            package_or_url: spec.to_string(),
            pip_args: options.pip_args.clone(),
            include_apps: options.include_apps,
            include_dependencies: options.include_dependencies,
            apps: apps.clone(),
        });
        venv.save_metadata(&metadata)?;

        let linked = if options.include_apps {
            self.linker
                .link_apps(&venv.bin_dir(), &apps, options.force)?
                .into_iter()
                .map(|l| l.name)
                .collect()
        } else {
            Vec::new()
        };

        Ok(InjectReport {
            package: name,
            venv: venv.name(),
            apps: linked,
        })
    }

    /// Remove an installed package: its links, then its venv.
    pub fn uninstall(&self, name: &str) -> Result<UninstallReport, Error> {
        let venv = self.container.venv(name);
        if !venv.exists() && !venv.has_metadata() {
            return Err(Error::NotInstalled {
                name: name.to_string(),
            });
        }
        let _lock = InstallLock::acquire(&self.home.locks_dir(), name)?;

        let mut unlinked = 0;
        if let Ok(metadata) = venv.load_metadata() {
            let apps = owned(&metadata.linked_apps());
            unlinked = self.linker.unlink_apps(&venv.bin_dir(), &apps)?.len();
        }
        venv.remove()?;

        Ok(UninstallReport {
            name: name.to_string(),
            unlinked,
        })
    }

    /// All venvs carrying pipkin metadata, sorted by name.
    pub fn list(&self) -> Vec<(String, VenvMetadata)> {
        self.container
            .iter_venvs()
            .into_iter()
            .filter_map(|venv| venv.load_metadata().ok().map(|m| (venv.name(), m)))
            .collect()
    }

    pub fn venv(&self, name: &str) -> Venv {
        self.container.venv(name)
    }
}

fn emit(on_phase: Option<&PhaseCallback>, phase: InstallPhase) {
    if let Some(callback) = on_phase {
        callback(phase);
    }
}

fn owned(apps: &[&str]) -> Vec<String> {
    apps.iter().map(|a| a.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    struct SilentSink;

    impl ProgressSink for SilentSink {
        fn is_interactive(&self) -> bool {
            false
        }
        fn replace_line(&mut self, _message: &str) {}
        fn append_line(&mut self, _message: &str) {}
        fn clear_line(&mut self) {}
    }

    fn installer(tmp: &TempDir) -> Installer {
        let home = Home::at(tmp.path().join("pipkin"), tmp.path().join("bin"));
        Installer::new(home).unwrap()
    }

    fn fake_installed(installer: &Installer, name: &str, apps: &[&str]) {
        let venv = installer.venv(name);
        fs::create_dir_all(venv.bin_dir()).unwrap();
        fs::write(venv.dir().join("pyvenv.cfg"), "home = /usr/bin\n").unwrap();

        for app in apps {
            let path = venv.bin_dir().join(app);
            fs::write(&path, b"#!/bin/sh\necho hi").unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
        }

        let metadata = VenvMetadata::new(PackageMetadata {
            package: name.to_string(),
            package_or_url: name.to_string(),
            pip_args: Vec::new(),
            include_apps: true,
            include_dependencies: false,
            apps: apps.iter().map(|a| a.to_string()).collect(),
        });
        venv.save_metadata(&metadata).unwrap();
    }

    #[tokio::test]
    async fn install_refuses_existing_without_force() {
        let tmp = TempDir::new().unwrap();
        let installer = installer(&tmp);
        fake_installed(&installer, "black", &["black"]);

        let options = InstallOptions {
            python: "python3".to_string(),
            pip_args: Vec::new(),
            force: false,
        };
        let mut tracker = InstallTracker::new(SilentSink);
        let result = installer.install("black", &options, &mut tracker, None).await;

        assert!(matches!(
            result,
            Err(Error::AlreadyInstalled { name }) if name == "black"
        ));
    }

    #[tokio::test]
    async fn inject_requires_existing_venv_with_metadata() {
        let tmp = TempDir::new().unwrap();
        let installer = installer(&tmp);

        let options = InjectOptions {
            pip_args: Vec::new(),
            include_apps: false,
            include_dependencies: false,
            force: false,
        };
        let mut tracker = InstallTracker::new(SilentSink);
        let result = installer.inject("black", "nox", &options, &mut tracker).await;
        assert!(matches!(result, Err(Error::MissingVenv { .. })));

        // A venv directory without metadata is also rejected.
        let venv = installer.venv("black");
        fs::create_dir_all(venv.bin_dir()).unwrap();
        fs::write(venv.dir().join("pyvenv.cfg"), "home = /usr/bin\n").unwrap();

        let mut tracker = InstallTracker::new(SilentSink);
        let result = installer.inject("black", "nox", &options, &mut tracker).await;
        assert!(matches!(result, Err(Error::MissingMetadata { .. })));
    }

    #[test]
    fn uninstall_unlinks_and_removes() {
        let tmp = TempDir::new().unwrap();
        let installer = installer(&tmp);
        fake_installed(&installer, "black", &["black", "blackd"]);

        let venv = installer.venv("black");
        installer
            .linker
            .link_apps(
                &venv.bin_dir(),
                &["black".to_string(), "blackd".to_string()],
                false,
            )
            .unwrap();
        assert!(tmp.path().join("bin/black").symlink_metadata().is_ok());

        let report = installer.uninstall("black").unwrap();
        assert_eq!(report.unlinked, 2);
        assert!(!venv.exists());
        assert!(tmp.path().join("bin/black").symlink_metadata().is_err());
    }

    #[test]
    fn uninstall_unknown_name_errors() {
        let tmp = TempDir::new().unwrap();
        let installer = installer(&tmp);
        assert!(matches!(
            installer.uninstall("ghost"),
            Err(Error::NotInstalled { .. })
        ));
    }

    #[test]
    fn list_returns_sorted_metadata_entries() {
        let tmp = TempDir::new().unwrap();
        let installer = installer(&tmp);
        fake_installed(&installer, "zulu", &["zulu"]);
        fake_installed(&installer, "alpha", &["alpha"]);
        // A stray directory without metadata is skipped.
        fs::create_dir_all(tmp.path().join("pipkin/venvs/stray")).unwrap();

        let entries = installer.list();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zulu"]);
    }
}
