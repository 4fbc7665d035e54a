use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("malformed IPv4 address '{input}': {reason}")]
    MalformedAddress { input: String, reason: String },

    #[error("malformed shard row: {reason}")]
    MalformedRow { reason: String },

    #[error("failed to read shard {path}")]
    ShardIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type GeoResult<T> = Result<T, GeoError>;
