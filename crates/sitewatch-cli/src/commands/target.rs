//! Target CRUD and monitoring control, operating directly on the stores —
//! no REST round trip, for operators with filesystem access to the database.

use clap::{Args, Subcommand};

use sitewatch_core::models::Target;
use sitewatch_core_types::TargetId;
use sitewatch_store::migrations::apply_migrations;
use sitewatch_store::{AlertStore, SnapshotStore, TargetStore};

#[derive(Debug, Args)]
pub struct TargetArgs {
    #[command(subcommand)]
    pub command: TargetCommand,
}

#[derive(Debug, Subcommand)]
pub enum TargetCommand {
    Create(CreateArgs),
    List(DbArgs),
    Get(IdArgs),
    Delete(IdArgs),
    StartMonitoring(StartMonitoringArgs),
    DisableMonitoring(IdArgs),
}

#[derive(Debug, Args)]
pub struct DbArgs {
    #[arg(long, default_value = "watch.sqlite3")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub db: DbArgs,
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value_t = 3600)]
    pub check_interval_secs: u64,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[command(flatten)]
    pub db: DbArgs,
    pub id: String,
}

#[derive(Debug, Args)]
pub struct StartMonitoringArgs {
    #[command(flatten)]
    pub db: DbArgs,
    pub id: String,
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

pub fn execute(args: TargetArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        TargetCommand::Create(a) => create(a),
        TargetCommand::List(a) => list(a),
        TargetCommand::Get(a) => get(a),
        TargetCommand::Delete(a) => delete(a),
        TargetCommand::StartMonitoring(a) => start_monitoring(a),
        TargetCommand::DisableMonitoring(a) => disable_monitoring(a),
    }
}

fn open_store(db: &DbArgs) -> Result<TargetStore, Box<dyn std::error::Error>> {
    let mut conn = sitewatch_store::db::open(&db.db)?;
    apply_migrations(&mut conn)?;
    Ok(TargetStore::new(conn))
}

fn create(args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let mut target = Target::new(args.owner, args.url, args.name);
    target.check_interval_secs = args.check_interval_secs;
    store.create(&target)?;
    println!("created target {}", target.id);
    Ok(())
}

fn list(args: DbArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args)?;
    for target in store.list_all()? {
        println!(
            "{}\t{}\t{}\tmonitoring={}\tversions={}",
            target.id, target.name, target.url, target.monitoring_enabled, target.total_versions
        );
    }
    Ok(())
}

fn get(args: IdArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let target = store.get(&TargetId::from_string(args.id))?;
    println!("{:#?}", target);
    Ok(())
}

/// Soft-deletes the target and cascades to its snapshots and alerts,
/// mirroring `Core::delete_target` without paying for a full bootstrap
/// (scheduler, event bus, background writers) for a one-off CLI command.
fn delete(args: IdArgs) -> Result<(), Box<dyn std::error::Error>> {
    let target_id = TargetId::from_string(args.id);

    let targets = open_store(&args.db)?;
    targets.soft_delete(&target_id)?;

    let mut snapshots_conn = sitewatch_store::db::open(&args.db.db)?;
    apply_migrations(&mut snapshots_conn)?;
    SnapshotStore::new(snapshots_conn).delete_by_target(&target_id)?;

    let mut alerts_conn = sitewatch_store::db::open(&args.db.db)?;
    apply_migrations(&mut alerts_conn)?;
    AlertStore::new(alerts_conn).delete_by_target(&target_id)?;

    println!("target deleted (cascaded to its snapshots and alerts)");
    Ok(())
}

fn start_monitoring(args: StartMonitoringArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let target_id = TargetId::from_string(args.id);
    store.get(&target_id)?;
    store.set_monitoring(&target_id, true, args.interval_secs)?;
    println!("monitoring enabled for {}", target_id);
    Ok(())
}

fn disable_monitoring(args: IdArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let target_id = TargetId::from_string(args.id);
    store.get(&target_id)?;
    store.set_monitoring(&target_id, false, None)?;
    println!("monitoring disabled for {}", target_id);
    Ok(())
}
