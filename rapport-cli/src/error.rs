//! Error types emitted by the rapport CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rapport_core::store::SqliteStoreError;
use rapport_engine::MatchError;
use thiserror::Error;

/// Errors emitted by the rapport CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name of the missing option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// An option was present but could not be interpreted.
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        /// Flag name of the offending option.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A referenced input path does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag name of the path option.
        field: &'static str,
        /// Path that was checked.
        path: Utf8PathBuf,
    },
    /// Opening the SQLite database failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteStoreError),
    /// Opening the batch request file failed.
    #[error("failed to open batch request at {path:?}: {source}")]
    OpenBatchRequest {
        /// Location of the request file.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Batch request JSON could not be decoded.
    #[error("failed to parse batch request JSON at {path:?}: {source}")]
    ParseBatchRequest {
        /// Location of the request file.
        path: Utf8PathBuf,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The engine rejected the request.
    #[error("matching failed: {0}")]
    Match(#[from] MatchError),
    /// Serialising the command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
