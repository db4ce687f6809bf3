use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use pk_core::{Error, InstallTracker};
use pk_io::{ConsoleSink, Home, InstallOptions, InstallPhase, Installer, PhaseCallback};

pub async fn execute(
    specs: Vec<String>,
    force: bool,
    python: String,
    pip_args: Vec<String>,
) -> Result<(), Error> {
    let start = Instant::now();
    let installer = Installer::new(Home::from_env()?)?;
    let options = InstallOptions {
        python,
        pip_args,
        force,
    };

    println!(
        "{} Installing {}...",
        style("==>").cyan().bold(),
        style(specs.join(", ")).bold()
    );

    let spinner_style = ProgressStyle::default_spinner()
        .template("    {prefix:<16} {spinner:.cyan} {msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut installed = 0usize;
    for spec in &specs {
        let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
        let spinner_slot = spinner.clone();
        let spinner_style = spinner_style.clone();
        let on_phase: PhaseCallback = Box::new(move |phase| {
            let mut slot = spinner_slot.lock().unwrap();
            match phase {
                InstallPhase::CreatingVenv { name } => {
                    let pb = ProgressBar::new_spinner();
                    pb.set_style(spinner_style.clone());
                    pb.set_prefix(name);
                    pb.set_message("creating virtual environment...");
                    pb.enable_steady_tick(Duration::from_millis(80));
                    *slot = Some(pb);
                }
                InstallPhase::VenvReady { .. } => {
                    if let Some(pb) = slot.take() {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        });

        let mut tracker = InstallTracker::new(ConsoleSink::stderr());
        let report = installer
            .install(spec, &options, &mut tracker, Some(&on_phase))
            .await?;

        if report.apps.is_empty() {
            println!("    {} (no apps)", style(&report.package).green());
        } else {
            println!(
                "    {} {}",
                style(&report.package).green(),
                style(report.apps.join(", ")).dim()
            );
        }
        installed += 1;
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "{} Installed {} packages in {:.2}s",
        style("==>").cyan().bold(),
        style(installed).green().bold(),
        elapsed.as_secs_f64()
    );

    Ok(())
}
