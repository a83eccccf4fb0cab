pub mod generate;
pub mod list;
pub mod monitor;
pub mod server;

use std::path::PathBuf;

use estufa_core::DashboardConfig;
use estufa_core::chart::WINDOW_PRESETS;

/// Where log records go.
pub enum LogTarget {
    Stderr,
    /// The TUI owns the terminal: drop records unless `RUST_LOG` asks for them.
    Hidden,
    File(PathBuf),
}

/// Initialise `env_logger`. `RUST_LOG` always wins over the default filter.
pub fn init_logging(target: LogTarget) {
    let default_filter = match target {
        LogTarget::Stderr => "warn",
        LogTarget::Hidden => "off",
        LogTarget::File(_) => "info",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let LogTarget::File(path) = target {
        match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }
    builder.init();
}

/// CLI flags layered over the config file.
#[derive(Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub offline: bool,
    pub refresh: Option<u64>,
    pub threshold: Option<u64>,
    pub window: Option<i64>,
}

impl Overrides {
    /// Defaults → config file → flags.
    pub fn resolve(self) -> Result<DashboardConfig, estufa_core::ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => DashboardConfig::from_json_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if self.offline {
            config.offline = true;
        }
        if let Some(secs) = self.refresh {
            config.refresh_secs = secs;
        }
        if let Some(min) = self.threshold {
            config.inactive_threshold_min = min;
        }
        if let Some(ms) = self.window {
            config.window_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the config or exit with the error on stderr.
pub fn load_config(overrides: Overrides) -> DashboardConfig {
    match overrides.resolve() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse a window preset such as `10m` or `5h` into milliseconds.
pub fn parse_window(s: &str) -> Result<i64, String> {
    let s = s.trim().to_ascii_lowercase();
    let (num, unit_ms) = if let Some(n) = s.strip_suffix("min") {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        return Err(format!("expected a window like 10m or 1h, got '{s}'"));
    };
    let ms = num
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid window '{s}'"))?
        * unit_ms;
    if WINDOW_PRESETS.contains(&ms) {
        Ok(ms)
    } else {
        Err(format!("'{s}' is not one of 1m, 10m, 30m, 1h, 5h, 20h"))
    }
}
