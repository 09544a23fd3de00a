//! Alert listing and status transitions, mirroring `GET /alerts` and
//! `PUT /alerts/{id}` (spec.md §6) for operators without HTTP access.

use clap::{Args, Subcommand};

use sitewatch_core_types::{AlertId, AlertStatus, TargetId};
use sitewatch_store::migrations::apply_migrations;
use sitewatch_store::AlertStore;

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    List(ListArgs),
    SetStatus(SetStatusArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value = "watch.sqlite3")]
    pub db: String,
    /// Restrict the listing to one target.
    #[arg(long)]
    pub target_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct SetStatusArgs {
    #[arg(long, default_value = "watch.sqlite3")]
    pub db: String,
    pub id: String,
    #[arg(value_enum)]
    pub status: StatusArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StatusArg {
    Unread,
    Read,
    Archived,
}

impl From<StatusArg> for AlertStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Unread => AlertStatus::Unread,
            StatusArg::Read => AlertStatus::Read,
            StatusArg::Archived => AlertStatus::Archived,
        }
    }
}

pub fn execute(args: AlertsArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        AlertsCommand::List(a) => list(a),
        AlertsCommand::SetStatus(a) => set_status(a),
    }
}

fn open_store(db: &str) -> Result<AlertStore, Box<dyn std::error::Error>> {
    let mut conn = sitewatch_store::db::open(db)?;
    apply_migrations(&mut conn)?;
    Ok(AlertStore::new(conn))
}

fn list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let rows = match args.target_id {
        Some(raw) => store.list_for_target(&TargetId::from_string(raw))?,
        None => store.list_all()?,
    };
    for alert in rows {
        println!(
            "{}\t{}\tv{}\t{}\t{}\t{}",
            alert.id, alert.target_id, alert.version_number, alert.severity, alert.status, alert.title
        );
    }
    Ok(())
}

fn set_status(args: SetStatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let alert_id = AlertId::from_string(args.id);
    store.set_status(&alert_id, args.status.into())?;
    println!("alert {} set to {}", alert_id, store.get(&alert_id)?.status);
    Ok(())
}
