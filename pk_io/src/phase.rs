/// Coarse phases of an installation, outside pip's own output stream
#[derive(Debug, Clone)]
pub enum InstallPhase {
    /// Creating the virtual environment (slow enough to warrant a spinner)
    CreatingVenv { name: String },
    /// Virtual environment exists and has a working interpreter
    VenvReady { name: String },
    /// pip is running; the line tracker owns the status line from here
    RunningPip { name: String },
    /// Apps linked into the shared bin directory
    Linked { name: String, apps: Vec<String> },
}

/// Callback type for phase reporting
pub type PhaseCallback = Box<dyn Fn(InstallPhase) + Send + Sync>;
