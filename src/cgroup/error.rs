use std::path::PathBuf;

use crate::fsutil;

use super::stats::ParseError;

/// Failure of a single lookup inside the cgroup engine.
///
/// Public resolvers swallow these and return their zero value; the `resolve_*`
/// functions hand them out so callers can tell the cases apart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cgroup file `{file_name}` not found under `{root}`")]
    NotFound { file_name: String, root: PathBuf },

    #[error("no entry for {hint} in cgroup membership file `{path}`")]
    ControllerNotFound { hint: String, path: PathBuf },

    #[error("key `{key}` not found in `{path}`")]
    KeyNotFound { key: String, path: PathBuf },

    #[error(transparent)]
    Read(#[from] fsutil::FileReadError),

    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cgroups are not supported on this platform")]
    Unsupported,
}

impl Error {
    /// Returns `true` for every flavour of "the file or entry is not there".
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } | Error::ControllerNotFound { .. } | Error::KeyNotFound { .. } => {
                true
            }
            Error::Read(err) => err.is_not_found(),
            Error::Parse { .. } | Error::Unsupported => false,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Error::Parse {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
