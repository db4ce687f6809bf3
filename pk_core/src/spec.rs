use crate::error::Error;

/// Derive the package (and venv) name from an install spec.
///
/// A spec is anything pip accepts: `black`, `black==24.1.0`,
/// `black[d]>=24`. URL and path specs carry no derivable name and are
/// rejected; pipkin needs the name up front to place the venv.
pub fn package_name_from_spec(spec: &str) -> Result<String, Error> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidSpec {
            spec: spec.to_string(),
            reason: "empty package spec".to_string(),
        });
    }
    if trimmed.contains("://") || trimmed.starts_with('.') || trimmed.starts_with('/') {
        return Err(Error::InvalidSpec {
            spec: spec.to_string(),
            reason: "cannot derive a package name from a URL or path spec; install by name"
                .to_string(),
        });
    }

    let name: String = trimmed
        .chars()
        .take_while(|c| !matches!(c, '[' | '=' | '<' | '>' | '!' | '~' | ';' | ' '))
        .collect();

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::InvalidSpec {
            spec: spec.to_string(),
            reason: "not a valid package name".to_string(),
        });
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_passes_through() {
        assert_eq!(package_name_from_spec("black").unwrap(), "black");
        assert_eq!(package_name_from_spec("ruff-lsp").unwrap(), "ruff-lsp");
    }

    #[test]
    fn version_and_extras_are_stripped() {
        assert_eq!(package_name_from_spec("black==24.1.0").unwrap(), "black");
        assert_eq!(package_name_from_spec("black[d]>=24").unwrap(), "black");
        assert_eq!(package_name_from_spec("nox~=2023.4").unwrap(), "nox");
    }

    #[test]
    fn url_and_path_specs_are_rejected() {
        assert!(package_name_from_spec("git+https://github.com/psf/black").is_err());
        assert!(package_name_from_spec("./dist/black-24.1.0.tar.gz").is_err());
        assert!(package_name_from_spec("/tmp/black.whl").is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(package_name_from_spec("").is_err());
        assert!(package_name_from_spec("   ").is_err());
        assert!(package_name_from_spec("==1.0").is_err());
    }
}
