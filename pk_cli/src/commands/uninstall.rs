use console::style;

use pk_core::Error;
use pk_io::{Home, Installer};

pub fn execute(name: &str) -> Result<(), Error> {
    let installer = Installer::new(Home::from_env()?)?;
    let report = installer.uninstall(name)?;

    println!(
        "{} Uninstalled {} ({} apps removed)",
        style("==>").cyan().bold(),
        style(&report.name).bold(),
        report.unlinked
    );
    Ok(())
}
