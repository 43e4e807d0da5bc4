//! Command Line Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("{_0}")]
    Config(#[error(not(source))] String),
    /// Opening the database or storage backend failed.
    #[display("could not start: {_0}")]
    Setup(#[error(not(source))] String),
    #[display("{_0}")]
    Pipeline(#[error(not(source))] String),
    #[display("could not access {_0}")]
    Io(#[error(not(source))] String),
    /// A batch command finished, but not every item succeeded.
    #[display("{_0} of {_1} deletions failed")]
    PartialFailure(usize, usize),
}

impl ErrorKind {
    #[track_caller]
    pub fn config(err: aicon_config::error::Error) -> Error {
        let reason = (*err).to_string();
        err.raise(Self::Config(reason))
    }

    #[track_caller]
    pub fn database(err: aicon_db::error::Error) -> Error {
        let reason = (*err).to_string();
        err.raise(Self::Setup(reason))
    }

    #[track_caller]
    pub fn storage(err: aicon_storage::error::Error) -> Error {
        let reason = (*err).to_string();
        err.raise(Self::Setup(reason))
    }

    #[track_caller]
    pub fn pipeline(err: aicon_pipeline::error::Error) -> Error {
        let reason = (*err).to_string();
        err.raise(Self::Pipeline(reason))
    }
}
