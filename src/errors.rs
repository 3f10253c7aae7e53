use thiserror::Error;

/// Errors surfaced while assembling a specification tree. Build-time only;
/// run-time outcomes are recorded on the nodes instead.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("empty argument: {0}")]
    EmptyArgument(&'static str),

    #[error("no attachment point for {0}")]
    NoAttachmentPoint(&'static str),
}

pub type BuildResult<T> = Result<T, BuildError>;
