use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("PERCENT_RE must compile"));
static SIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*)/(\d+\.?\d*)\s+(KB|MB|GB)").expect("SIZED_RE must compile")
});
static ETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"eta\s+([\d:]+)").expect("ETA_RE must compile"));
static COLLECTING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Collecting\s+([^\s(]+)").expect("COLLECTING_RE must compile"));
static DOWNLOADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Downloading\s+(\S+)").expect("DOWNLOADING_RE must compile"));
static SIZE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("SIZE_HINT_RE must compile"));
static INSTALLING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Installing collected packages:\s+(.+)").expect("INSTALLING_RE must compile")
});
static INSTALLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Successfully installed\s+(.+)").expect("INSTALLED_RE must compile")
});
static WHEEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Building wheel for\s+([^\s(]+)").expect("WHEEL_RE must compile")
});
static CACHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Using cached\s+(\S+)").expect("CACHED_RE must compile"));

/// Unit of a sized download-progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Kb,
    Mb,
    Gb,
}

impl SizeUnit {
    fn parse(s: &str) -> Option<SizeUnit> {
        match s {
            "KB" => Some(SizeUnit::Kb),
            "MB" => Some(SizeUnit::Mb),
            "GB" => Some(SizeUnit::Gb),
            _ => None,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeUnit::Kb => write!(f, "KB"),
            SizeUnit::Mb => write!(f, "MB"),
            SizeUnit::Gb => write!(f, "GB"),
        }
    }
}

/// One recognized event from a single line of pip output.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Percentage {
        percent: u32,
    },
    SizedProgress {
        downloaded: f64,
        total: f64,
        unit: SizeUnit,
        eta: Option<String>,
    },
    Collecting {
        package: String,
    },
    Downloading {
        filename: String,
        size_hint: Option<String>,
    },
    UsingCached {
        filename: String,
    },
    InstallingCollected {
        packages: String,
    },
    SuccessfullyInstalled {
        packages: String,
    },
    BuildingWheel {
        package: String,
    },
}

/// Map one raw output line to a recognized event, or `None`.
///
/// Rules are evaluated in a fixed priority order and the first matching rule
/// wins. Lines that match no rule are ignored by the caller; pip's output
/// format is not a contract.
pub fn classify(raw: &str) -> Option<LineEvent> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    // A bare "NN%" token is only meaningful on a progress-bar render. pip
    // draws its bar with heavy box-drawing characters and space padding, so
    // anything else quoting a percentage (error text, package descriptions)
    // must not be taken as a tick.
    if looks_like_bar_render(raw, line)
        && let Some(caps) = PERCENT_RE.captures(line)
    {
        return caps[1]
            .parse::<u32>()
            .ok()
            .map(|percent| LineEvent::Percentage { percent });
    }

    if let Some(caps) = SIZED_RE.captures(line) {
        let downloaded = caps[1].parse::<f64>().ok();
        let total = caps[2].parse::<f64>().ok();
        let unit = SizeUnit::parse(&caps[3]);
        return match (downloaded, total, unit) {
            (Some(downloaded), Some(total), Some(unit)) => Some(LineEvent::SizedProgress {
                downloaded,
                total,
                unit,
                eta: ETA_RE.captures(line).map(|c| c[1].to_string()),
            }),
            _ => None,
        };
    }

    if line.starts_with("Collecting ")
        && let Some(caps) = COLLECTING_RE.captures(line)
    {
        return Some(LineEvent::Collecting {
            package: caps[1].to_string(),
        });
    }

    if line.starts_with("Downloading ")
        && let Some(caps) = DOWNLOADING_RE.captures(line)
    {
        return Some(LineEvent::Downloading {
            filename: caps[1].to_string(),
            size_hint: SIZE_HINT_RE.captures(line).map(|c| c[1].to_string()),
        });
    }

    if line.starts_with("Installing collected packages:")
        && let Some(caps) = INSTALLING_RE.captures(line)
    {
        return Some(LineEvent::InstallingCollected {
            packages: caps[1].to_string(),
        });
    }

    if line.starts_with("Successfully installed ")
        && let Some(caps) = INSTALLED_RE.captures(line)
    {
        return Some(LineEvent::SuccessfullyInstalled {
            packages: caps[1].to_string(),
        });
    }

    if line.starts_with("Building wheel for ")
        && let Some(caps) = WHEEL_RE.captures(line)
    {
        return Some(LineEvent::BuildingWheel {
            package: caps[1].to_string(),
        });
    }

    if line.starts_with("Using cached ")
        && let Some(caps) = CACHED_RE.captures(line)
    {
        return Some(LineEvent::UsingCached {
            filename: caps[1].to_string(),
        });
    }

    None
}

fn looks_like_bar_render(raw: &str, trimmed: &str) -> bool {
    raw.starts_with(' ') || trimmed.contains('━') || trimmed.contains('╸')
}

/// Derive the distribution name from a wheel or sdist filename.
///
/// Filenames are hyphen-delimited with the name first; names that themselves
/// contain hyphens are truncated at the first one. Known limitation.
pub fn package_name_from_filename(filename: &str) -> Option<&str> {
    match filename.split('-').next() {
        Some("") | None => None,
        Some(name) => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_lines_are_ignored() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        assert_eq!(classify("Requirement already satisfied: pip"), None);
        assert_eq!(classify("WARNING: something odd happened"), None);
        assert_eq!(classify("  error: subprocess-exited-with-error"), None);
    }

    #[test]
    fn percentage_requires_a_bar_render() {
        assert_eq!(
            classify("   ━━━━━━━━━━ 50%"),
            Some(LineEvent::Percentage { percent: 50 })
        );
        // Same token without bar characters or padding is not a tick.
        assert_eq!(classify("at 50% of capacity"), None);
    }

    #[test]
    fn sized_progress_with_eta() {
        assert_eq!(
            classify("15.2/69.2 MB 350.1 kB/s eta 0:02:35"),
            Some(LineEvent::SizedProgress {
                downloaded: 15.2,
                total: 69.2,
                unit: SizeUnit::Mb,
                eta: Some("0:02:35".to_string()),
            })
        );
    }

    #[test]
    fn sized_progress_without_eta() {
        assert_eq!(
            classify("5.0/17.3 GB"),
            Some(LineEvent::SizedProgress {
                downloaded: 5.0,
                total: 17.3,
                unit: SizeUnit::Gb,
                eta: None,
            })
        );
    }

    #[test]
    fn bar_render_with_sizes_but_no_percent_is_sized_progress() {
        // Contains bar characters, so rule 1 is tried first; without a "%"
        // token it falls through to the sized rule.
        assert_eq!(
            classify("   ━━━━╸      15.2/69.2 MB 350.1 kB/s eta 0:02:35"),
            Some(LineEvent::SizedProgress {
                downloaded: 15.2,
                total: 69.2,
                unit: SizeUnit::Mb,
                eta: Some("0:02:35".to_string()),
            })
        );
    }

    #[test]
    fn collecting_token_stops_at_whitespace_or_paren() {
        assert_eq!(
            classify("Collecting black"),
            Some(LineEvent::Collecting {
                package: "black".to_string()
            })
        );
        assert_eq!(
            classify("Collecting click>=8.0.0 (from black)"),
            Some(LineEvent::Collecting {
                package: "click>=8.0.0".to_string()
            })
        );
    }

    #[test]
    fn downloading_captures_filename_and_size_hint() {
        assert_eq!(
            classify("Downloading black-24.1.0-py3-none-any.whl (1.4 MB)"),
            Some(LineEvent::Downloading {
                filename: "black-24.1.0-py3-none-any.whl".to_string(),
                size_hint: Some("1.4 MB".to_string()),
            })
        );
        assert_eq!(
            classify("Downloading black-24.1.0-py3-none-any.whl"),
            Some(LineEvent::Downloading {
                filename: "black-24.1.0-py3-none-any.whl".to_string(),
                size_hint: None,
            })
        );
    }

    #[test]
    fn installing_and_installed_capture_remainders() {
        assert_eq!(
            classify("Installing collected packages: click, black"),
            Some(LineEvent::InstallingCollected {
                packages: "click, black".to_string()
            })
        );
        assert_eq!(
            classify("Successfully installed black-24.1.0 click-8.1.7"),
            Some(LineEvent::SuccessfullyInstalled {
                packages: "black-24.1.0 click-8.1.7".to_string()
            })
        );
    }

    #[test]
    fn building_wheel_and_using_cached() {
        assert_eq!(
            classify("Building wheel for pycowsay (pyproject.toml)"),
            Some(LineEvent::BuildingWheel {
                package: "pycowsay".to_string()
            })
        );
        assert_eq!(
            classify("Using cached black-24.1.0-py3-none-any.whl (1.4 MB)"),
            Some(LineEvent::UsingCached {
                filename: "black-24.1.0-py3-none-any.whl".to_string()
            })
        );
    }

    #[test]
    fn percentage_wins_over_sized_on_one_line() {
        // pip renders both on one bar line; first match wins.
        assert_eq!(
            classify("   ━━━━━ 22% 15.2/69.2 MB"),
            Some(LineEvent::Percentage { percent: 22 })
        );
    }

    #[test]
    fn filename_name_heuristic() {
        assert_eq!(
            package_name_from_filename("black-24.1.0-py3-none-any.whl"),
            Some("black")
        );
        assert_eq!(package_name_from_filename("nodashes.whl"), Some("nodashes.whl"));
        assert_eq!(package_name_from_filename("-odd.whl"), None);
    }
}
