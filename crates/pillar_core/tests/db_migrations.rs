use pillar_core::db::migrations::latest_version;
use pillar_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "visions");
    assert_table_exists(&conn, "goals");
    assert_table_exists(&conn, "tasks");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pillar.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO goals (id, vision_id, tier, title) VALUES ('g1', 'missing', 'three_year', 'Orphan');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn second_override_for_same_occurrence_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tasks (id, kind, title, scheduled_date, recurrence_frequency, recurrence_interval)
         VALUES ('s1', 'recurring', 'Tempo run', '2025-01-06', 'weekly', 1);
         INSERT INTO tasks (id, parent_task_id, kind, title, scheduled_date, occurrence_date)
         VALUES ('d1', 's1', 'detached', 'Tempo run', '2025-01-13', '2025-01-13');",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO tasks (id, parent_task_id, kind, title, scheduled_date, occurrence_date)
         VALUES ('d2', 's1', 'detached', 'Moved', '2025-01-14', '2025-01-13');",
        [],
    );
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
