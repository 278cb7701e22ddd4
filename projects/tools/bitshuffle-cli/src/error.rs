use bitshuffle_api::BitshuffleError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Bitshuffle(#[from] BitshuffleError),
    #[error("Invalid codec settings: {0}")]
    Codec(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
