use shosai_api::traits::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failures of the playback controller. Messages are meant for the reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("{0} not found")]
    NotFound(String),

    #[error("this novel has no chapters")]
    NoChapters,

    #[error("chapter \"{0}\" has no source file")]
    NoSourceFile(String),

    #[error("already at the last chapter")]
    EndOfList,

    #[error("already at the first chapter")]
    StartOfList,

    #[error("still loading, please wait")]
    Busy,

    #[error("no novel is loaded")]
    NotReady,

    /// Transport or server failure, message passed through verbatim.
    #[error("{0}")]
    Transport(String),
}

impl PlayerError {
    /// Map a service failure; `what` names the resource for not-found errors.
    pub fn from_service<E: ServiceError>(err: E, what: impl Into<String>) -> Self {
        if err.is_not_found() {
            PlayerError::NotFound(what.into())
        } else {
            PlayerError::Transport(err.to_string())
        }
    }

    /// The media or chapter exists but has nothing to read.
    pub fn is_empty_content(&self) -> bool {
        matches!(self, PlayerError::NoChapters | PlayerError::NoSourceFile(_))
    }
}
