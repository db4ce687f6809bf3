use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use console::style;

mod commands;
mod ensurepath;

#[derive(Parser)]
#[command(name = "pipkin", version)]
#[command(about = "Install and run Python applications in isolated environments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package into its own virtual environment and expose its apps
    Install {
        /// Package specs understood by pip (name, name==version, name[extra])
        #[arg(required = true)]
        specs: Vec<String>,
        /// Reinstall even if already installed
        #[arg(long)]
        force: bool,
        /// Interpreter used to create the virtual environment
        #[arg(long, env = "PIPKIN_DEFAULT_PYTHON", default_value = "python3")]
        python: String,
        /// Extra arguments passed through to pip (quoted, space separated)
        #[arg(long = "pip-args", value_name = "ARGS", allow_hyphen_values = true)]
        pip_args: Option<String>,
    },
    /// Install packages into an existing venv
    Inject {
        /// Venv to inject into (named after its main package)
        venv: String,
        /// Package specs understood by pip
        specs: Vec<String>,
        /// Read specs from requirements files instead
        #[arg(short = 'r', long = "requirement", value_name = "FILE")]
        requirement_files: Vec<PathBuf>,
        /// Also expose the injected package's apps on PATH
        #[arg(long = "include-apps")]
        include_apps: bool,
        /// Also expose apps of dependencies (requires --include-apps)
        #[arg(long = "include-deps")]
        include_dependencies: bool,
        /// Replace conflicting files when linking apps
        #[arg(long)]
        force: bool,
        /// Extra arguments passed through to pip (quoted, space separated)
        #[arg(long = "pip-args", value_name = "ARGS", allow_hyphen_values = true)]
        pip_args: Option<String>,
    },
    /// Remove an installed package, its venv, and its linked apps
    Uninstall {
        name: String,
    },
    /// List installed packages and their apps
    List,
    /// Print a JSON snapshot of all venvs
    Freeze {
        /// Venvs to leave out
        #[arg(long = "skip", value_name = "NAME")]
        skip: Vec<String>,
    },
    /// Put the app bin directory on PATH in your shell config
    Ensurepath,
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", style("error:").red().bold());
        if let pk_core::Error::PipFailed { tail, .. } = &e {
            for line in tail {
                eprintln!("    {}", style(line).dim());
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), pk_core::Error> {
    match cli.command {
        Commands::Install {
            specs,
            force,
            python,
            pip_args,
        } => commands::install::execute(specs, force, python, split_pip_args(pip_args)).await,
        Commands::Inject {
            venv,
            specs,
            requirement_files,
            include_apps,
            include_dependencies,
            force,
            pip_args,
        } => {
            commands::inject::execute(
                venv,
                specs,
                requirement_files,
                include_apps,
                include_dependencies,
                force,
                split_pip_args(pip_args),
            )
            .await
        }
        Commands::Uninstall { name } => commands::uninstall::execute(&name),
        Commands::List => commands::list::execute(),
        Commands::Freeze { skip } => commands::freeze::execute(&skip),
        Commands::Ensurepath => {
            let home = pk_io::Home::from_env()?;
            ensurepath::ensure_path(home.bin_dir())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pipkin", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn split_pip_args(raw: Option<String>) -> Vec<String> {
    raw.map(|args| args.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
