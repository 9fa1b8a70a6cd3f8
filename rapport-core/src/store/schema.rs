//! SQLite schema for profiles, places and cached match results.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Layout version recorded in `rapport_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the store tables inside an existing SQLite database.
///
/// Tables are created idempotently and the schema version is recorded on
/// first use. A database written with a different version is rejected so
/// migrations can be applied explicitly.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use rapport_core::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("schema creation is idempotent");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM rapport_schema_version LIMIT 1", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create users",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY CHECK (length(trim(id)) > 0),
            profile TEXT,
            current_city TEXT
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create places",
        "CREATE TABLE IF NOT EXISTS places (
            id TEXT PRIMARY KEY CHECK (length(trim(id)) > 0),
            tags TEXT NOT NULL DEFAULT '[]',
            price_level INTEGER,
            vibe_scores TEXT,
            categories TEXT
        ) WITHOUT ROWID",
    )?;
    // `mode` is '' rather than NULL so it can take part in the primary key.
    run_migration_step(
        transaction,
        "create match_cache",
        "CREATE TABLE IF NOT EXISTS match_cache (
            user_id TEXT NOT NULL,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            mode TEXT NOT NULL DEFAULT '',
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            breakdown TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            calculated_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            PRIMARY KEY (user_id, target_type, target_id, mode)
        ) WITHOUT ROWID",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index match_cache expiry",
        "CREATE INDEX IF NOT EXISTS idx_match_cache_expiry
            ON match_cache(expires_at)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS rapport_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM rapport_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO rapport_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when initialising the store schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A DDL statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Human-readable name of the step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was written with an incompatible layout.
    #[error("expected store schema version {expected} but found {found}; apply migrations before retrying")]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
