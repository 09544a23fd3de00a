//! Migration SQL, embedded at compile time.

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_targets",
            sql: include_str!("../../migrations/001_targets.sql"),
        },
        Migration {
            id: "002_snapshots",
            sql: include_str!("../../migrations/002_snapshots.sql"),
        },
        Migration {
            id: "003_snapshot_diffs",
            sql: include_str!("../../migrations/003_snapshot_diffs.sql"),
        },
        Migration {
            id: "004_alerts",
            sql: include_str!("../../migrations/004_alerts.sql"),
        },
    ]
}
