//! CLI for estufa — greenhouse drying monitor in your terminal.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "estufa")]
#[command(about = "estufa — greenhouse drying monitor: humidity, battery and process timelines")]
#[command(version = estufa_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live interactive dashboard (TUI)
    Monitor {
        /// Backend base URL (default: http://127.0.0.1:8042)
        #[arg(long)]
        api_url: Option<String>,

        /// Seconds between backend polls
        #[arg(long)]
        refresh: Option<u64>,

        /// Never contact the backend; show synthetic data
        #[arg(long)]
        offline: bool,

        /// Minutes of silence before a sensor counts as inactive
        #[arg(long)]
        threshold: Option<u64>,

        /// Initial chart window: 1m, 10m, 30m, 1h, 5h, 20h
        #[arg(long, value_parser = commands::parse_window)]
        window: Option<i64>,

        /// JSON config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write log output to this file (stderr is hidden behind the TUI)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Print every installation with its KPIs
    List {
        /// Backend base URL (default: http://127.0.0.1:8042)
        #[arg(long)]
        api_url: Option<String>,

        /// Never contact the backend; show synthetic data
        #[arg(long)]
        offline: bool,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Minutes of silence before a sensor counts as inactive
        #[arg(long)]
        threshold: Option<u64>,

        /// JSON config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print a synthetic /api/estufas payload
    Generate {
        /// Seed for reproducible readings
        #[arg(long)]
        seed: Option<u64>,

        /// Response shape
        #[arg(long, default_value = "array", value_parser = ["array", "wrapped", "single"])]
        shape: String,
    },

    /// Run the mock backend
    Server {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port
        #[arg(long, default_value = "8042")]
        port: u16,

        /// Seed for reproducible readings (default: fresh readings per request)
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_target = match &cli.command {
        Commands::Monitor {
            log_file: Some(path),
            ..
        } => commands::LogTarget::File(path.clone()),
        Commands::Monitor { .. } => commands::LogTarget::Hidden,
        _ => commands::LogTarget::Stderr,
    };
    commands::init_logging(log_target);

    match cli.command {
        Commands::Monitor {
            api_url,
            refresh,
            offline,
            threshold,
            window,
            config,
            log_file: _,
        } => commands::monitor::run(commands::Overrides {
            config_path: config,
            api_url,
            offline,
            refresh,
            threshold,
            window,
        }),
        Commands::List {
            api_url,
            offline,
            json,
            threshold,
            config,
        } => commands::list::run(
            commands::Overrides {
                config_path: config,
                api_url,
                offline,
                threshold,
                ..Default::default()
            },
            json,
        ),
        Commands::Generate { seed, shape } => commands::generate::run(seed, &shape),
        Commands::Server { host, port, seed } => commands::server::run(&host, port, seed),
    }
}
