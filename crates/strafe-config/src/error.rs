//! Errors from loading and saving `config.ron`.

use std::path::PathBuf;

/// A config file could not be read, written, parsed or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid RON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("can't serialize config: {0}")]
    Serialize(#[from] ron::Error),

    /// A value parsed but is unusable, e.g. zero reconnect attempts.
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
