use console::style;

use pk_core::Error;
use pk_io::{Home, Installer};

pub fn execute() -> Result<(), Error> {
    let installer = Installer::new(Home::from_env()?)?;
    let entries = installer.list();

    if entries.is_empty() {
        println!("nothing has been installed with pipkin 😴");
        return Ok(());
    }

    println!(
        "venvs are in {}, apps are exposed on PATH at {}",
        style(installer.home().venvs_dir().display()).bold(),
        style(installer.home().bin_dir().display()).bold()
    );
    for (name, metadata) in entries {
        println!(
            "    {} {}",
            style(&name).green(),
            style(&metadata.main_package.package_or_url).dim()
        );
        for app in metadata.linked_apps() {
            println!("        - {app}");
        }
        for injected in metadata.injected_packages.keys() {
            println!("        injected: {injected}");
        }
    }
    Ok(())
}
