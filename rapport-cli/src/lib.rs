//! Command-line interface for scoring users against stored users and places.
//!
//! Every subcommand opens a SQLite database, builds a [`MatchingEngine`]
//! backed by a [`DurableCache`] over the same database and prints its result
//! as pretty JSON on stdout. Options layer from CLI flags, `RAPPORT_*`
//! environment variables and configuration files.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::Utf8Path;
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use rapport_core::{MatchMode, store::SqliteStore};
use rapport_engine::{DEFAULT_DURABLE_TTL, DurableCache, MatchingEngine};
use serde::Serialize;

mod batch;
mod error;
mod invalidate;
mod score;

pub use error::CliError;

use batch::{BatchArgs, run_batch_with};
use invalidate::{InvalidateArgs, run_invalidate_with};
use score::{ScoreArgs, run_score_with};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_USER_ID: &str = "user-id";
pub(crate) const ARG_TARGET_TYPE: &str = "target-type";
pub(crate) const ARG_TARGET_ID: &str = "target-id";
pub(crate) const ARG_MODE: &str = "mode";
pub(crate) const ARG_CACHE_TTL_SECS: &str = "cache-ttl-secs";
pub(crate) const ARG_BATCH_REQUEST: &str = "request-path";

/// Run the rapport CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration, the database or the
/// engine reject the invocation, or when output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Score(args) => run_score_with(args, writer),
        Command::Batch(args) => run_batch_with(args, writer),
        Command::Invalidate(args) => run_invalidate_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "rapport",
    about = "Explainable compatibility scores between users and places",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score one target for one user.
    Score(ScoreArgs),
    /// Score a JSON batch of targets for one user.
    Batch(BatchArgs),
    /// Drop every cached score computed for a user.
    Invalidate(InvalidateArgs),
}

/// Engine type every subcommand runs against.
pub(crate) type SqliteEngine = MatchingEngine<SqliteStore, DurableCache<SqliteStore>>;

/// Open `database` and wire an engine whose cache lives in the same file.
pub(crate) fn open_engine(database: &Utf8Path, ttl: TimeDelta) -> Result<SqliteEngine, CliError> {
    let store = SqliteStore::open(database.as_std_path())?;
    let cache = DurableCache::with_ttl(store.clone(), ttl);
    Ok(MatchingEngine::new(store, cache))
}

/// Fail unless `path` names an existing file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        })
    }
}

/// Interpret an optional mode label.
pub(crate) fn parse_mode(raw: Option<&str>) -> Result<Option<MatchMode>, CliError> {
    raw.map(|label| {
        label
            .parse::<MatchMode>()
            .map_err(|source| CliError::InvalidArgument {
                field: ARG_MODE,
                reason: source.to_string(),
            })
    })
    .transpose()
}

/// Convert a cache lifetime in seconds, defaulting to one hour.
pub(crate) fn cache_ttl(secs: Option<u64>) -> Result<TimeDelta, CliError> {
    let Some(value) = secs else {
        return Ok(DEFAULT_DURABLE_TTL);
    };
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .filter(|ttl| *ttl > TimeDelta::zero())
        .ok_or_else(|| CliError::InvalidArgument {
            field: ARG_CACHE_TTL_SECS,
            reason: format!("{value} is not a usable number of seconds"),
        })
}

/// Write `value` to `writer` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
