//! `invalidate` command: forget a user's cached scores.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_USER_ID, CliError, cache_ttl, open_engine, require_existing, write_json,
};

pub(crate) const ENV_INVALIDATE_DATABASE: &str = "RAPPORT_CMDS_INVALIDATE_DATABASE";
pub(crate) const ENV_INVALIDATE_USER_ID: &str = "RAPPORT_CMDS_INVALIDATE_USER_ID";

/// CLI arguments for the `invalidate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "invalidate",
    long_about = "Remove every cached score computed for a user, typically \
                 after their profile has changed.",
    about = "Drop every cached score computed for a user"
)]
#[ortho_config(prefix = "RAPPORT")]
pub(crate) struct InvalidateArgs {
    /// Path to the SQLite database holding the cache.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// User whose cached scores are dropped.
    #[arg(long = ARG_USER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) user_id: Option<String>,
}

impl InvalidateArgs {
    pub(crate) fn into_config(self) -> Result<InvalidateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        InvalidateConfig::try_from(merged)
    }
}

/// Resolved `invalidate` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvalidateConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) user_id: String,
}

impl TryFrom<InvalidateArgs> for InvalidateConfig {
    type Error = CliError;

    fn try_from(args: InvalidateArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_INVALIDATE_DATABASE,
        })?;
        let user_id = args.user_id.ok_or(CliError::MissingArgument {
            field: ARG_USER_ID,
            env: ENV_INVALIDATE_USER_ID,
        })?;
        Ok(Self { database, user_id })
    }
}

/// Summary printed after invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvalidationReport {
    pub(crate) user_id: String,
    pub(crate) removed: usize,
}

pub(crate) fn run_invalidate_with(
    args: InvalidateArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.database, ARG_DATABASE)?;
    let engine = open_engine(&config.database, cache_ttl(None)?)?;
    let removed = engine.invalidate_user_matches(&config.user_id)?;
    write_json(
        writer,
        &InvalidationReport {
            user_id: config.user_id,
            removed,
        },
    )
}
