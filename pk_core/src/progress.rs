use std::collections::BTreeSet;

use crate::classify::{LineEvent, SizeUnit, classify, package_name_from_filename};

/// A rendering surface owned by exactly one tracker for one pip invocation.
///
/// Implementations must never fail; terminal write errors are swallowed at
/// the sink so the tracker stays off the critical path of the install.
pub trait ProgressSink {
    /// Whether the surface supports in-place line rewriting. Fixed for the
    /// lifetime of the sink.
    fn is_interactive(&self) -> bool;

    /// Erase the current status line and write `message` in its place,
    /// leaving no trailing newline.
    fn replace_line(&mut self, message: &str);

    /// Write `message` as a full line with trailing newline.
    fn append_line(&mut self, message: &str);

    /// Erase the current status line, leaving the cursor at column 0.
    fn clear_line(&mut self);
}

/// The most recent in-progress action, as inferred from pip's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Collecting,
    Downloading,
    Building,
    UsingCached,
    Installing,
    Completed,
}

/// Tracks one pip invocation's output and keeps a single status line current.
///
/// Fed strictly in arrival order by whoever reads the subprocess stream; never
/// blocks, never fails, and silently ignores every line it cannot classify.
/// `finish` must be called exactly once when the stream ends, normally or not.
pub struct InstallTracker<S> {
    sink: S,
    interactive: bool,
    current_package: Option<String>,
    current_action: Option<Action>,
    seen_packages: BTreeSet<String>,
    collecting_shown: bool,
    downloading_shown: bool,
    installing_shown: bool,
    last_rendered: String,
}

impl<S: ProgressSink> InstallTracker<S> {
    pub fn new(sink: S) -> Self {
        let interactive = sink.is_interactive();
        Self {
            sink,
            interactive,
            current_package: None,
            current_action: None,
            seen_packages: BTreeSet::new(),
            collecting_shown: false,
            downloading_shown: false,
            installing_shown: false,
            last_rendered: String::new(),
        }
    }

    /// Consume one raw output line.
    pub fn on_line(&mut self, raw: &str) {
        let Some(event) = classify(raw) else {
            return;
        };
        self.apply(event);
    }

    /// Clear any in-place status line. Idempotent; a no-op when nothing is
    /// displayed or the surface is not interactive.
    pub fn finish(&mut self) {
        if self.interactive && !self.last_rendered.is_empty() {
            self.clear();
        }
    }

    /// Number of distinct packages seen in `Collecting` lines so far.
    pub fn seen_count(&self) -> usize {
        self.seen_packages.len()
    }

    pub fn current_action(&self) -> Option<Action> {
        self.current_action
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn apply(&mut self, event: LineEvent) {
        match event {
            LineEvent::Percentage { percent } => self.on_percentage(percent),
            LineEvent::SizedProgress {
                downloaded,
                total,
                unit,
                eta,
            } => self.on_sized(downloaded, total, unit, eta),
            LineEvent::Collecting { package } => self.on_collecting(package),
            LineEvent::Downloading {
                filename,
                size_hint,
            } => self.on_fetch(&filename, size_hint, Action::Downloading),
            LineEvent::UsingCached { filename } => {
                self.on_fetch(&filename, None, Action::UsingCached);
            }
            LineEvent::InstallingCollected { packages } => self.on_installing(&packages),
            LineEvent::SuccessfullyInstalled { .. } => self.on_installed(),
            LineEvent::BuildingWheel { package } => {
                // Tracked only; wheel builds print nothing of their own.
                self.current_package = Some(package);
                self.current_action = Some(Action::Building);
            }
        }
    }

    fn on_percentage(&mut self, percent: u32) {
        // Percentage ticks repeat fast; they are in-place-only detail and
        // would spam a non-interactive log.
        if !self.interactive {
            return;
        }
        let Some(package) = self.current_package.clone() else {
            return;
        };
        match self.current_action {
            Some(Action::Downloading) => {
                self.display(format!("Downloading {package}... {percent}%"));
            }
            Some(Action::Collecting) => {
                self.display(format!("Resolving {package}... {percent}%"));
            }
            _ => {}
        }
    }

    fn on_sized(&mut self, downloaded: f64, total: f64, unit: SizeUnit, eta: Option<String>) {
        if !self.interactive || self.current_action != Some(Action::Downloading) {
            return;
        }
        let Some(package) = self.current_package.clone() else {
            return;
        };
        if total <= 0.0 {
            return;
        }
        let percent = ((downloaded / total) * 100.0) as u32;
        let mut message =
            format!("Downloading {package}... {percent}% ({downloaded:.1}/{total:.1} {unit})");
        if let Some(eta) = eta {
            message.push_str(&format!(" ETA: {eta}"));
        }
        self.display(message);
    }

    fn on_collecting(&mut self, package: String) {
        if self.seen_packages.contains(&package) {
            return;
        }
        self.seen_packages.insert(package.clone());
        self.current_package = Some(package);
        self.current_action = Some(Action::Collecting);
        self.collecting_shown = true;

        let count = self.seen_packages.len();
        self.display(format!("📦 Resolving dependencies... ({count} found)"));
    }

    fn on_fetch(&mut self, filename: &str, size_hint: Option<String>, action: Action) {
        if !self.downloading_shown {
            self.downloading_shown = true;
            // First fetch replaces the resolving banner.
            if self.interactive && self.collecting_shown {
                self.clear();
            }
        }

        let Some(package) = package_name_from_filename(filename) else {
            return;
        };
        let package = package.to_string();
        let message = match (action, &size_hint) {
            (Action::UsingCached, _) => format!("💾 Using cached {package}..."),
            (_, Some(hint)) => format!("⬇️ Downloading {package} ({hint})..."),
            (_, None) => format!("⬇️ Downloading {package}..."),
        };
        self.current_package = Some(package);
        self.current_action = Some(action);
        self.display(message);
    }

    fn on_installing(&mut self, packages: &str) {
        self.current_action = Some(Action::Installing);
        if self.installing_shown {
            return;
        }
        self.installing_shown = true;
        if self.interactive {
            self.clear();
        }
        self.display(format!("📦 Installing: {packages}"));
    }

    fn on_installed(&mut self) {
        self.current_action = Some(Action::Completed);
        // The package list is left to the caller's final summary.
        if self.interactive {
            self.clear();
        }
    }

    fn display(&mut self, message: String) {
        if message == self.last_rendered {
            return;
        }
        if self.interactive {
            self.sink.replace_line(&message);
        } else {
            self.sink.append_line(&message);
        }
        self.last_rendered = message;
    }

    fn clear(&mut self) {
        self.sink.clear_line();
        self.last_rendered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Replace(String),
        Append(String),
        Clear,
    }

    struct RecordingSink {
        interactive: bool,
        ops: Vec<Op>,
    }

    impl RecordingSink {
        fn new(interactive: bool) -> Self {
            Self {
                interactive,
                ops: Vec::new(),
            }
        }
    }

    impl ProgressSink for RecordingSink {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn replace_line(&mut self, message: &str) {
            self.ops.push(Op::Replace(message.to_string()));
        }

        fn append_line(&mut self, message: &str) {
            self.ops.push(Op::Append(message.to_string()));
        }

        fn clear_line(&mut self) {
            self.ops.push(Op::Clear);
        }
    }

    fn interactive_tracker() -> InstallTracker<RecordingSink> {
        InstallTracker::new(RecordingSink::new(true))
    }

    fn plain_tracker() -> InstallTracker<RecordingSink> {
        InstallTracker::new(RecordingSink::new(false))
    }

    #[test]
    fn interactive_install_transcript() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Collecting foo");
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl (12 kB)");
        tracker.on_line("Installing collected packages: foo");
        tracker.on_line("Successfully installed foo-1.0");
        tracker.finish();

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Replace("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Clear,
                Op::Replace("⬇️ Downloading foo (12 kB)...".to_string()),
                Op::Clear,
                Op::Replace("📦 Installing: foo".to_string()),
                Op::Clear,
            ]
        );
    }

    #[test]
    fn unrecognized_lines_change_nothing() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Requirement already satisfied: pip");
        tracker.on_line("");
        tracker.on_line("WARNING: pip is being invoked by an old script wrapper");
        assert_eq!(tracker.seen_count(), 0);
        assert_eq!(tracker.current_action(), None);
        assert!(tracker.into_sink().ops.is_empty());
    }

    #[test]
    fn collecting_counts_distinct_packages_only() {
        let mut tracker = plain_tracker();
        tracker.on_line("Collecting black");
        tracker.on_line("Collecting black");
        tracker.on_line("Collecting click>=8.0.0 (from black)");
        tracker.on_line("Collecting black");

        assert_eq!(tracker.seen_count(), 2);
        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Append("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Append("📦 Resolving dependencies... (2 found)".to_string()),
            ]
        );
    }

    #[test]
    fn duplicate_messages_render_once_in_plain_mode() {
        let mut tracker = plain_tracker();
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl (12 kB)");
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl (12 kB)");

        assert_eq!(
            tracker.into_sink().ops,
            vec![Op::Append("⬇️ Downloading foo (12 kB)...".to_string())]
        );
    }

    #[test]
    fn percentage_ticks_are_suppressed_in_plain_mode() {
        let mut tracker = plain_tracker();
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl (12 kB)");
        tracker.on_line("   ━━━━━━━━ 50%");
        tracker.on_line("15.2/69.2 MB 350.1 kB/s eta 0:02:35");

        let ops = tracker.into_sink().ops;
        assert_eq!(ops.len(), 1);
        assert_eq!(
            ops[0],
            Op::Append("⬇️ Downloading foo (12 kB)...".to_string())
        );
    }

    #[test]
    fn percentage_renders_for_download_and_resolve() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Collecting foo");
        tracker.on_line("   ━━━━ 10%");
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl");
        tracker.on_line("   ━━━━ 55%");

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Replace("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Replace("Resolving foo... 10%".to_string()),
                Op::Clear,
                Op::Replace("⬇️ Downloading foo...".to_string()),
                Op::Replace("Downloading foo... 55%".to_string()),
            ]
        );
    }

    #[test]
    fn sized_progress_truncates_percent_and_keeps_eta() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl");
        tracker.on_line("15.2/69.2 MB 350.1 kB/s eta 0:02:35");

        let ops = tracker.into_sink().ops;
        assert_eq!(
            ops.last(),
            Some(&Op::Replace(
                "Downloading foo... 21% (15.2/69.2 MB) ETA: 0:02:35".to_string()
            ))
        );
    }

    #[test]
    fn sized_progress_guards_zero_total() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl");
        tracker.on_line("5.0/0.0 MB");
        // Only the download banner rendered; the zero-total line did nothing.
        assert_eq!(tracker.into_sink().ops.len(), 1);
    }

    #[test]
    fn sized_progress_ignored_outside_download_context() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Collecting foo");
        tracker.on_line("15.2/69.2 MB 350.1 kB/s eta 0:02:35");

        assert_eq!(
            tracker.into_sink().ops,
            vec![Op::Replace(
                "📦 Resolving dependencies... (1 found)".to_string()
            )]
        );
    }

    #[test]
    fn using_cached_replaces_resolve_banner() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Collecting foo");
        tracker.on_line("Using cached foo-1.0-py3-none-any.whl (12 kB)");

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Replace("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Clear,
                Op::Replace("💾 Using cached foo...".to_string()),
            ]
        );
    }

    #[test]
    fn building_wheel_is_tracked_but_silent() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Building wheel for pycowsay (pyproject.toml)");
        assert_eq!(tracker.current_action(), Some(Action::Building));

        // Percentage ticks while building render nothing.
        tracker.on_line("   ━━━━ 80%");
        assert!(tracker.into_sink().ops.is_empty());
    }

    #[test]
    fn installing_banner_shows_once() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Installing collected packages: click, black");
        tracker.on_line("Installing collected packages: click, black");

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Clear,
                Op::Replace("📦 Installing: click, black".to_string()),
            ]
        );
    }

    #[test]
    fn finish_is_idempotent_and_noop_when_nothing_shown() {
        let mut tracker = interactive_tracker();
        tracker.finish();
        tracker.finish();
        assert!(tracker.into_sink().ops.is_empty());

        let mut tracker = interactive_tracker();
        tracker.on_line("Collecting foo");
        tracker.finish();
        tracker.finish();
        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Replace("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Clear,
            ]
        );
    }

    #[test]
    fn finish_after_success_line_does_not_clear_twice() {
        let mut tracker = interactive_tracker();
        tracker.on_line("Installing collected packages: foo");
        tracker.on_line("Successfully installed foo-1.0");
        tracker.finish();

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Clear,
                Op::Replace("📦 Installing: foo".to_string()),
                Op::Clear,
            ]
        );
    }

    #[test]
    fn plain_mode_never_clears() {
        let mut tracker = plain_tracker();
        tracker.on_line("Collecting foo");
        tracker.on_line("Downloading foo-1.0-py3-none-any.whl (12 kB)");
        tracker.on_line("Installing collected packages: foo");
        tracker.on_line("Successfully installed foo-1.0");
        tracker.finish();

        assert_eq!(
            tracker.into_sink().ops,
            vec![
                Op::Append("📦 Resolving dependencies... (1 found)".to_string()),
                Op::Append("⬇️ Downloading foo (12 kB)...".to_string()),
                Op::Append("📦 Installing: foo".to_string()),
            ]
        );
    }
}
