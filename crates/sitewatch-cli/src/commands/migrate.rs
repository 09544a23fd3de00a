//! Applies the embedded SQL migrations to a database file without starting
//! the rest of the engine. Useful for provisioning a fresh deployment ahead
//! of the first `sitewatch serve`.

use clap::Args;
use sitewatch_store::migrations::apply_migrations;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Path to the SQLite database file. Created if absent.
    #[arg(long, default_value = "watch.sqlite3")]
    pub db: String,
}

pub fn execute(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = sitewatch_store::db::open(&args.db)?;
    apply_migrations(&mut conn)?;
    println!("migrations applied to {}", args.db);
    Ok(())
}
