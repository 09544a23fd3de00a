//! Connection management.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::errors::{from_rusqlite, Result};

/// Opens a SQLite database at the given path, creating it if absent.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Opens an in-memory database private to this connection. Each call gets
/// its own database, which is exactly what isolated unit tests want but
/// wrong for any deployment that needs several connections (one per store)
/// to see the same data; use [`open_shared_memory`] for that case.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Opens an in-memory database identified by `name`, shared across every
/// connection that opens the same name in this process via SQLite's
/// `cache=shared` URI mode. Lets `database_path = ":memory:"` deployments
/// give the target, snapshot, and alert stores independent `Connection`s
/// that still read and write the same data, the way three connections to
/// an on-disk file already do.
pub fn open_shared_memory(name: &str) -> Result<Connection> {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(uri, flags).map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .map_err(from_rusqlite)?;
    conn.execute("PRAGMA journal_mode = WAL", [])
        .map_err(from_rusqlite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_in_memory_connections_are_isolated() {
        let a = open_in_memory().unwrap();
        let b = open_in_memory().unwrap();
        a.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        assert!(b.execute("INSERT INTO t VALUES (1)", []).is_err());
    }

    #[test]
    fn shared_memory_connections_with_the_same_name_see_each_others_writes() {
        let a = open_shared_memory("sitewatch_db_test_shared").unwrap();
        let b = open_shared_memory("sitewatch_db_test_shared").unwrap();
        a.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        a.execute("INSERT INTO t VALUES (42)", []).unwrap();
        let value: i64 = b.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(value, 42);
    }
}
