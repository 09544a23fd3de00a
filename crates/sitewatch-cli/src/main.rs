//! sitewatch CLI
//!
//! Command-line interface for operating the change-detection engine:
//! running the REST server, administering targets, running one-off
//! captures, and triaging alerts without going through HTTP.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "sitewatch")]
#[command(about = "Competitor website change-detection and versioning engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the REST server.
    Serve(commands::serve::ServeArgs),
    /// Apply embedded SQL migrations to a database.
    Migrate(commands::migrate::MigrateArgs),
    /// Target CRUD and monitoring control.
    Target(commands::target::TargetArgs),
    /// Manual capture against a target.
    Capture(commands::capture::CaptureArgs),
    /// Alert listing and status updates.
    Alerts(commands::alerts::AlertsArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args),
        Commands::Migrate(args) => commands::migrate::execute(args),
        Commands::Target(args) => commands::target::execute(args),
        Commands::Capture(args) => commands::capture::execute(args),
        Commands::Alerts(args) => commands::alerts::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
