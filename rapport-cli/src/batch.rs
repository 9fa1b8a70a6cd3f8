//! `batch` command: many targets for one user from a JSON request file.

use std::{fs::File, io::BufReader, io::Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::TimeDelta;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rapport_core::BatchMatchRequest;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BATCH_REQUEST, ARG_CACHE_TTL_SECS, ARG_DATABASE, CliError, cache_ttl, open_engine,
    require_existing, write_json,
};

pub(crate) const ENV_BATCH_REQUEST: &str = "RAPPORT_CMDS_BATCH_REQUEST_PATH";
pub(crate) const ENV_BATCH_DATABASE: &str = "RAPPORT_CMDS_BATCH_DATABASE";

/// CLI arguments for the `batch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "batch",
    long_about = "Score many targets for one user. The request is a JSON \
                 document with a userId and a list of requests, each naming \
                 a targetType, a targetId and an optional mode. Entries that \
                 cannot be scored are reported as omitted.",
    about = "Score a JSON batch of targets for one user"
)]
#[ortho_config(prefix = "RAPPORT")]
pub(crate) struct BatchArgs {
    /// Path to a JSON file containing a batch request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Path to the SQLite database holding users, places and the cache.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Lifetime of newly cached scores, in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
}

impl BatchArgs {
    pub(crate) fn into_config(self) -> Result<BatchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BatchConfig::try_from(merged)
    }
}

/// Resolved `batch` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchConfig {
    /// Path to the JSON request file.
    pub(crate) request_path: Utf8PathBuf,
    /// Path to the SQLite database.
    pub(crate) database: Utf8PathBuf,
    /// Lifetime of newly cached scores.
    pub(crate) cache_ttl: TimeDelta,
}

impl BatchConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.request_path, ARG_BATCH_REQUEST)?;
        require_existing(&self.database, ARG_DATABASE)?;
        Ok(())
    }
}

impl TryFrom<BatchArgs> for BatchConfig {
    type Error = CliError;

    fn try_from(args: BatchArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_BATCH_REQUEST,
            env: ENV_BATCH_REQUEST,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_BATCH_DATABASE,
        })?;
        Ok(Self {
            request_path,
            database,
            cache_ttl: cache_ttl(args.cache_ttl_secs)?,
        })
    }
}

pub(crate) fn run_batch_with(args: BatchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let request = load_batch_request(&config.request_path)?;
    let engine = open_engine(&config.database, config.cache_ttl)?;
    let outcome = engine.calculate_batch_matches(&request)?;
    write_json(writer, &outcome)
}

/// Loads a JSON-encoded [`BatchMatchRequest`] from disk.
pub(crate) fn load_batch_request(path: &Utf8Path) -> Result<BatchMatchRequest, CliError> {
    let file = File::open(path.as_std_path()).map_err(|source| CliError::OpenBatchRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseBatchRequest {
        path: path.to_path_buf(),
        source,
    })
}
