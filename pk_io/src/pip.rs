use std::path::Path;
use std::process::Stdio;

use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use pk_core::{Error, InstallTracker, ProgressSink};

/// Build the pip invocation installing `spec` with a venv's interpreter.
pub fn pip_install_command(python: &Path, pip_args: &[String], spec: &str) -> Command {
    let mut cmd = Command::new(python);
    cmd.arg("-m").arg("pip").arg("install").arg("--no-input");
    cmd.args(pip_args);
    cmd.arg(spec);
    cmd
}

/// What a streamed subprocess run produced.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub success: bool,
    pub status: String,
    pub lines: Vec<String>,
}

impl StreamOutcome {
    /// The last few output lines, for error reporting.
    pub fn tail(&self) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(10);
        self.lines[skip..].to_vec()
    }
}

/// Run a command and feed every output line to the tracker.
///
/// stdout and stderr are read line-by-line and consumed in arrival order;
/// bytes that are not valid UTF-8 are decoded lossily rather than erroring.
/// The tracker's `finish` runs on every exit path past the spawn, so the
/// terminal is left clean even when the subprocess dies mid-line.
pub async fn run_streaming<S: ProgressSink>(
    mut cmd: Command,
    tracker: &mut InstallTracker<S>,
) -> Result<StreamOutcome, Error> {
    debug!("running {:?}", cmd.as_std());
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::environment("failed to spawn subprocess", e))?;

    let stdout = child.stdout.take().ok_or_else(|| Error::Environment {
        message: "subprocess stdout was not captured".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| Error::Environment {
        message: "subprocess stderr was not captured".to_string(),
    })?;

    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    let mut out_buf: Vec<u8> = Vec::new();
    let mut err_buf: Vec<u8> = Vec::new();
    let mut out_done = false;
    let mut err_done = false;
    let mut lines = Vec::new();

    while !(out_done && err_done) {
        tokio::select! {
            read = out.read_until(b'\n', &mut out_buf), if !out_done => {
                if !consume(read, &mut out_buf, tracker, &mut lines) {
                    out_done = true;
                }
            }
            read = err.read_until(b'\n', &mut err_buf), if !err_done => {
                if !consume(read, &mut err_buf, tracker, &mut lines) {
                    err_done = true;
                }
            }
        }
    }

    let status = child.wait().await;
    tracker.finish();

    let status = status.map_err(|e| Error::environment("failed to wait for subprocess", e))?;
    Ok(StreamOutcome {
        success: status.success(),
        status: status.to_string(),
        lines,
    })
}

fn consume<S: ProgressSink>(
    read: std::io::Result<usize>,
    buf: &mut Vec<u8>,
    tracker: &mut InstallTracker<S>,
    lines: &mut Vec<String>,
) -> bool {
    match read {
        // EOF, or a read error ends this channel; the other may still flow.
        Ok(0) | Err(_) => false,
        Ok(_) => {
            let line = String::from_utf8_lossy(buf)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            tracker.on_line(&line);
            lines.push(line);
            buf.clear();
            true
        }
    }
}
