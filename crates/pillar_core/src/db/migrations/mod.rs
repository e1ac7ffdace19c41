//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register planner schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "hierarchy",
        sql: include_str!("0001_hierarchy.sql"),
    },
    Migration {
        version: 2,
        name: "tasks",
        sql: include_str!("0002_tasks.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_pending(conn, MIGRATIONS)
}

fn apply_pending(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = migrations.last().map_or(0, |migration| migration.version);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| {
                error!(
                    "event=db_migrate module=db status=error version={} name={} error={}",
                    migration.version, migration.name, source
                );
                DbError::Migration {
                    version: migration.version,
                    name: migration.name,
                    source,
                }
            })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}

/// Reads the schema version recorded on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply_pending, current_user_version, Migration, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn registry_versions_increase_by_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1);
        }
    }

    #[test]
    fn failed_migration_is_named_and_rolls_back_earlier_ones() {
        let mut conn = Connection::open_in_memory().unwrap();
        let broken = [
            MIGRATIONS[0],
            Migration {
                version: 2,
                name: "broken_tasks",
                sql: "CREATE TABLE tasks (id TEXT PRIMARY KEY REFERENCES;",
            },
        ];

        let err = apply_pending(&mut conn, &broken).unwrap_err();
        assert!(matches!(
            err,
            DbError::Migration { version: 2, name: "broken_tasks", .. }
        ));
        assert!(err.to_string().starts_with("planner migration 2 (broken_tasks) failed"));

        assert_eq!(current_user_version(&conn).unwrap(), 0);
        let visions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'visions';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(visions, 0);
    }
}
