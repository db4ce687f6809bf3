use std::fs;
use std::path::Path;

use console::style;

use pk_core::Error;

const PK_BLOCK_START: &str = "# >>> pipkin >>>";
const PK_BLOCK_END: &str = "# <<< pipkin <<<";

enum ShellConfigKind {
    Posix,
    Fish,
}

/// Make sure the app bin directory is on PATH by writing a managed block into
/// the user's shell configuration. Re-running replaces the block in place.
pub fn ensure_path(bin_dir: &Path) -> Result<(), Error> {
    let shell = std::env::var("SHELL").unwrap_or_default();
    let home = std::env::var("HOME").map_err(|_| Error::Environment {
        message: "HOME not set".to_string(),
    })?;

    let (config_file, shell_kind) = if shell.contains("zsh") {
        let zdotdir = std::env::var("ZDOTDIR").unwrap_or_else(|_| home.clone());
        let zshenv = format!("{zdotdir}/.zshenv");
        let zshrc = format!("{zdotdir}/.zshrc");

        if Path::new(&zshenv).exists() {
            (zshenv, ShellConfigKind::Posix)
        } else if Path::new(&zshrc).exists() {
            (zshrc, ShellConfigKind::Posix)
        } else {
            (format!("{home}/.zshrc"), ShellConfigKind::Posix)
        }
    } else if shell.contains("bash") {
        let bash_profile = format!("{home}/.bash_profile");
        if Path::new(&bash_profile).exists() {
            (bash_profile, ShellConfigKind::Posix)
        } else {
            (format!("{home}/.bashrc"), ShellConfigKind::Posix)
        }
    } else if shell.contains("fish") {
        (
            format!("{home}/.config/fish/conf.d/pipkin.fish"),
            ShellConfigKind::Fish,
        )
    } else {
        (format!("{home}/.profile"), ShellConfigKind::Posix)
    };

    let block_body = match shell_kind {
        ShellConfigKind::Posix => format!(
            r#"
# pipkin
case ":${{PATH}}:" in
    *:"{bin}":*) ;;
    *) export PATH="{bin}:$PATH" ;;
esac
"#,
            bin = bin_dir.display()
        ),
        ShellConfigKind::Fish => format!(
            r#"
# pipkin
if not contains -- "{bin}" $PATH
    set -gx PATH "{bin}" $PATH
end
"#,
            bin = bin_dir.display()
        ),
    };
    let managed_block = format!("{PK_BLOCK_START}{block_body}{PK_BLOCK_END}\n");

    let existing = fs::read_to_string(&config_file).unwrap_or_default();
    let updated = upsert_managed_block(&existing, &managed_block);

    if let Some(parent) = Path::new(&config_file).parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::environment(
                &format!("failed to create shell config directory {}", parent.display()),
                e,
            )
        })?;
    }
    fs::write(&config_file, updated)
        .map_err(|e| Error::environment(&format!("failed to write {config_file}"), e))?;

    println!(
        "    {} Added {} to PATH in {}",
        style("✓").green(),
        bin_dir.display(),
        config_file
    );
    println!("    Open a new shell for the change to take effect.");
    Ok(())
}

fn upsert_managed_block(existing: &str, managed_block: &str) -> String {
    if let Some(start_idx) = existing.find(PK_BLOCK_START)
        && let Some(end_rel_idx) = existing[start_idx..].find(PK_BLOCK_END)
    {
        let mut end_idx = start_idx + end_rel_idx + PK_BLOCK_END.len();
        if existing[end_idx..].starts_with("\r\n") {
            end_idx += 2;
        } else if existing[end_idx..].starts_with('\n') {
            end_idx += 1;
        }
        let mut out = String::with_capacity(existing.len() + managed_block.len());
        out.push_str(&existing[..start_idx]);
        out.push_str(managed_block);
        out.push_str(&existing[end_idx..]);
        return out;
    }

    if existing.trim().is_empty() {
        managed_block.to_string()
    } else {
        let mut out = String::with_capacity(existing.len() + managed_block.len() + 1);
        out.push_str(existing);
        if !existing.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(managed_block);
        out
    }
}
