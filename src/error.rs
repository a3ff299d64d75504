use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShortFormError {
    #[error("Note content cannot be empty")]
    EmptyContent,

    #[error("Malformed note id '{0}'. Expected a full id (36 characters) or an 8 character short id")]
    MalformedId(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("{count} notes start with '{prefix}'. Try again using the full id")]
    AmbiguousId { prefix: String, count: usize },

    #[error("Invalid age '{0}'. Expected a number of days such as '2d'")]
    InvalidAge(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Failed to decrypt note, the secret may be wrong")]
    Decryption,

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Secure notes require a secret, none is configured")]
    SecretRequired,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{cause} (rollback also failed: {rollback})")]
    Rollback {
        cause: Box<ShortFormError>,
        rollback: String,
    },

    #[error("Refusing to delete without confirmation. Pass --yes when stdin is not a terminal")]
    ConfirmationRequired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShortFormError {
    /// True for errors raised before any storage access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ShortFormError::EmptyContent
                | ShortFormError::MalformedId(_)
                | ShortFormError::InvalidAge(_)
                | ShortFormError::InvalidDate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShortFormError>;
