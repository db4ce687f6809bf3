use pk_core::{Error, freeze_document};
use pk_io::{Home, Installer};

pub fn execute(skip: &[String]) -> Result<(), Error> {
    let installer = Installer::new(Home::from_env()?)?;
    let entries: Vec<_> = installer
        .list()
        .into_iter()
        .filter(|(name, _)| !skip.contains(name))
        .collect();

    let doc = freeze_document(&entries)?;
    let rendered = serde_json::to_string_pretty(&doc)
        .map_err(|e| Error::environment("failed to render freeze output", e))?;
    println!("{rendered}");
    Ok(())
}
