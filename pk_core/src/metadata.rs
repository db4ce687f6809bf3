use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::error::Error;

/// Version stamp written into every metadata document and freeze output.
pub const PIPKIN_SPEC_VERSION: &str = "0.1";

/// How one package was installed into a venv.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageMetadata {
    pub package: String,
    pub package_or_url: String,
    #[serde(default)]
    pub pip_args: Vec<String>,
    #[serde(default)]
    pub include_apps: bool,
    #[serde(default)]
    pub include_dependencies: bool,
    #[serde(default)]
    pub apps: Vec<String>,
}

/// The JSON document persisted in each venv directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenvMetadata {
    pub spec_version: String,
    pub main_package: PackageMetadata,
    #[serde(default)]
    pub injected_packages: BTreeMap<String, PackageMetadata>,
}

impl VenvMetadata {
    pub fn new(main_package: PackageMetadata) -> Self {
        Self {
            spec_version: PIPKIN_SPEC_VERSION.to_string(),
            main_package,
            injected_packages: BTreeMap::new(),
        }
    }

    /// Record an injected package, replacing any previous entry of the same
    /// name.
    pub fn merge_injected(&mut self, package: PackageMetadata) {
        self.injected_packages
            .insert(package.package.clone(), package);
    }

    /// Apps that are (or should be) linked onto PATH: the main package's,
    /// plus those of injected packages installed with apps included.
    pub fn linked_apps(&self) -> Vec<&str> {
        let mut apps: Vec<&str> = Vec::new();
        if self.main_package.include_apps {
            apps.extend(self.main_package.apps.iter().map(String::as_str));
        }
        for injected in self.injected_packages.values() {
            if injected.include_apps {
                apps.extend(injected.apps.iter().map(String::as_str));
            }
        }
        apps
    }
}

/// Build the `freeze` output document from all installed venvs.
///
/// App listings are machine-local detail and are stripped from the output;
/// keys serialize in sorted order.
pub fn freeze_document(entries: &[(String, VenvMetadata)]) -> Result<Value, Error> {
    let mut venvs = serde_json::Map::new();
    for (name, metadata) in entries {
        let mut value = serde_json::to_value(metadata).map_err(|e| Error::Environment {
            message: format!("failed to serialize metadata for '{name}': {e}"),
        })?;
        strip_apps(&mut value);
        venvs.insert(name.clone(), json!({ "metadata": value }));
    }
    Ok(json!({
        "pipkin_spec_version": PIPKIN_SPEC_VERSION,
        "venvs": Value::Object(venvs),
    }))
}

fn strip_apps(metadata: &mut Value) {
    if let Some(main) = metadata.get_mut("main_package").and_then(Value::as_object_mut) {
        main.remove("apps");
    }
    if let Some(injected) = metadata
        .get_mut("injected_packages")
        .and_then(Value::as_object_mut)
    {
        for entry in injected.values_mut() {
            if let Some(entry) = entry.as_object_mut() {
                entry.remove("apps");
            }
        }
    }
}
