//! End-to-end CLI tests: invoke the built `sitewatch` binary against a
//! throwaway database file and check both its stdout and the resulting
//! database rows.

use std::process::Command;

use rusqlite::Connection;
use tempfile::TempDir;

fn sitewatch(db: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sitewatch-cli"))
        .arg(args[0])
        .args(&args[1..])
        .arg("--db")
        .arg(db)
        .output()
        .expect("failed to execute sitewatch binary")
}

#[test]
fn migrate_then_create_target_then_capture_then_list_alerts() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("watch.sqlite3");

    let migrate = Command::new(env!("CARGO_BIN_EXE_sitewatch-cli"))
        .args(["migrate", "--db"])
        .arg(&db_path)
        .output()
        .unwrap();
    assert!(migrate.status.success(), "{}", String::from_utf8_lossy(&migrate.stderr));

    let create = sitewatch(
        &db_path,
        &[
            "target", "create", "--owner", "user-1", "--url", "https://acme.test", "--name", "Acme",
        ],
    );
    assert!(create.status.success(), "{}", String::from_utf8_lossy(&create.stderr));
    let stdout = String::from_utf8_lossy(&create.stdout);
    let target_id = stdout
        .trim()
        .strip_prefix("created target ")
        .expect("create output names the new target id")
        .to_string();

    let capture = Command::new(env!("CARGO_BIN_EXE_sitewatch-cli"))
        .args(["capture", "--db"])
        .arg(&db_path)
        .arg(&target_id)
        .args(["--html", "<html><body><h1>Hello</h1></body></html>"])
        .output()
        .unwrap();
    assert!(capture.status.success(), "{}", String::from_utf8_lossy(&capture.stderr));
    assert!(String::from_utf8_lossy(&capture.stdout).contains("initial capture"));

    let conn = Connection::open(&db_path).unwrap();
    let snapshot_count: i64 = conn
        .query_row("SELECT count(*) FROM snapshots", [], |row| row.get(0))
        .unwrap();
    assert_eq!(snapshot_count, 1);

    let delete = sitewatch(&db_path, &["target", "delete", &target_id]);
    assert!(delete.status.success(), "{}", String::from_utf8_lossy(&delete.stderr));

    let remaining_snapshots: i64 = conn
        .query_row("SELECT count(*) FROM snapshots", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining_snapshots, 0, "delete must cascade to snapshots");
}
