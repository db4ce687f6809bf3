pub mod home;
pub mod install;
pub mod link;
pub mod lock;
pub mod phase;
pub mod pip;
pub mod terminal;
pub mod venv;

pub use home::Home;
pub use install::{
    InjectOptions, InjectReport, InstallOptions, InstallReport, Installer, UninstallReport,
};
pub use link::{AppLinker, LinkedApp};
pub use lock::InstallLock;
pub use phase::{InstallPhase, PhaseCallback};
pub use pip::{StreamOutcome, pip_install_command, run_streaming};
pub use terminal::ConsoleSink;
pub use venv::{METADATA_FILE, Venv, VenvContainer, new_apps};
