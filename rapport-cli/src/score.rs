//! `score` command: one target for one user.

use std::io::Write;

use camino::Utf8PathBuf;
use chrono::TimeDelta;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rapport_core::MatchRequest;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CACHE_TTL_SECS, ARG_DATABASE, ARG_MODE, ARG_TARGET_ID, ARG_TARGET_TYPE, ARG_USER_ID,
    CliError, cache_ttl, open_engine, parse_mode, require_existing, write_json,
};

pub(crate) const ENV_SCORE_DATABASE: &str = "RAPPORT_CMDS_SCORE_DATABASE";
pub(crate) const ENV_SCORE_USER_ID: &str = "RAPPORT_CMDS_SCORE_USER_ID";
pub(crate) const ENV_SCORE_TARGET_TYPE: &str = "RAPPORT_CMDS_SCORE_TARGET_TYPE";
pub(crate) const ENV_SCORE_TARGET_ID: &str = "RAPPORT_CMDS_SCORE_TARGET_ID";

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "score",
    long_about = "Score a user against another user or a place. A fresh \
                 cached score is reused; otherwise the score is computed and \
                 cached in the same database.",
    about = "Score one target for one user"
)]
#[ortho_config(prefix = "RAPPORT")]
pub(crate) struct ScoreArgs {
    /// Path to the SQLite database holding users, places and the cache.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// User being matched.
    #[arg(long = ARG_USER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) user_id: Option<String>,
    /// Kind of target: `user` or `place`.
    #[arg(long = ARG_TARGET_TYPE, value_name = "type")]
    #[serde(default)]
    pub(crate) target_type: Option<String>,
    /// Identifier of the target.
    #[arg(long = ARG_TARGET_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) target_id: Option<String>,
    /// Matching mode for user targets: `current` or `travel`.
    #[arg(long = ARG_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<String>,
    /// Lifetime of newly cached scores, in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
}

impl ScoreArgs {
    pub(crate) fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreConfig {
    /// Path to the SQLite database.
    pub(crate) database: Utf8PathBuf,
    /// Request handed to the engine.
    pub(crate) request: MatchRequest,
    /// Lifetime of newly cached scores.
    pub(crate) cache_ttl: TimeDelta,
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_SCORE_DATABASE,
        })?;
        let user_id = args.user_id.ok_or(CliError::MissingArgument {
            field: ARG_USER_ID,
            env: ENV_SCORE_USER_ID,
        })?;
        let target_type = args.target_type.ok_or(CliError::MissingArgument {
            field: ARG_TARGET_TYPE,
            env: ENV_SCORE_TARGET_TYPE,
        })?;
        let target_id = args.target_id.ok_or(CliError::MissingArgument {
            field: ARG_TARGET_ID,
            env: ENV_SCORE_TARGET_ID,
        })?;
        let mut request = MatchRequest::new(user_id, target_type, target_id);
        request.mode = parse_mode(args.mode.as_deref())?;
        Ok(Self {
            database,
            request,
            cache_ttl: cache_ttl(args.cache_ttl_secs)?,
        })
    }
}

pub(crate) fn run_score_with(args: ScoreArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_score(&config, writer)
}

pub(crate) fn execute_score(config: &ScoreConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    require_existing(&config.database, ARG_DATABASE)?;
    let engine = open_engine(&config.database, config.cache_ttl)?;
    let result = engine.calculate_match(&config.request)?;
    write_json(writer, &result)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}
