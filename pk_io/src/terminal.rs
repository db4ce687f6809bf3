use std::io::Write;

use console::Term;

use pk_core::ProgressSink;

/// Progress sink over the stderr terminal.
///
/// Interactivity is probed once at construction; an interactive terminal gets
/// carriage-return in-place updates, anything else gets one plain line per
/// distinct message. Write errors are swallowed: a broken status line must
/// never fail an install.
pub struct ConsoleSink {
    term: Term,
    interactive: bool,
}

impl ConsoleSink {
    pub fn stderr() -> Self {
        let term = Term::stderr();
        let interactive = term.is_term();
        Self { term, interactive }
    }
}

impl ProgressSink for ConsoleSink {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn replace_line(&mut self, message: &str) {
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!("  {message}"));
        let _ = self.term.flush();
    }

    fn append_line(&mut self, message: &str) {
        let _ = self.term.write_line(&format!("  {message}"));
    }

    fn clear_line(&mut self) {
        let _ = self.term.clear_line();
        let _ = self.term.flush();
    }
}
