use std::fs;
use std::path::PathBuf;

use console::style;

use pk_core::{Error, InstallTracker};
use pk_io::{ConsoleSink, Home, InjectOptions, Installer};

pub async fn execute(
    venv: String,
    specs: Vec<String>,
    requirement_files: Vec<PathBuf>,
    include_apps: bool,
    include_dependencies: bool,
    force: bool,
    pip_args: Vec<String>,
) -> Result<(), Error> {
    if include_dependencies && !include_apps {
        return Err(Error::Environment {
            message: "cannot pass --include-deps if --include-apps is not passed as well"
                .to_string(),
        });
    }
    if specs.is_empty() && requirement_files.is_empty() {
        return Err(Error::Environment {
            message: "package specs or requirement files must be provided; see 'pipkin inject --help'"
                .to_string(),
        });
    }
    if !specs.is_empty() && !requirement_files.is_empty() {
        return Err(Error::Environment {
            message: "package specs and --requirement cannot be passed at the same time".to_string(),
        });
    }

    let packages = if requirement_files.is_empty() {
        specs
    } else {
        read_requirements(&requirement_files)?
    };

    let installer = Installer::new(Home::from_env()?)?;
    let options = InjectOptions {
        pip_args,
        include_apps,
        include_dependencies,
        force,
    };

    for spec in &packages {
        let mut tracker = InstallTracker::new(ConsoleSink::stderr());
        let report = installer.inject(&venv, spec, &options, &mut tracker).await?;
        println!(
            "  injected package {} into venv {}",
            style(&report.package).bold(),
            style(&report.venv).bold()
        );
    }
    eprintln!("done! ✨ 🌟 ✨");

    Ok(())
}

fn read_requirements(files: &[PathBuf]) -> Result<Vec<String>, Error> {
    let mut packages = Vec::new();
    for file in files {
        let content = fs::read_to_string(file)
            .map_err(|e| Error::environment(&format!("failed to read {}", file.display()), e))?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            packages.push(line.to_string());
        }
    }
    Ok(packages)
}
