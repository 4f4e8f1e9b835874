use thiserror::Error;

/// Why an inbound wire value failed to parse as an [`Envelope`](crate::Envelope).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("wire value is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` is not a string")]
    NotAString(&'static str),
}

/// Why a module's own decoder rejected an envelope addressed to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("unknown tag `{0}`")]
    UnknownTag(String),

    #[error("bad args for tag `{tag}`: {reason}")]
    BadArgs { tag: String, reason: String },
}

impl MessageError {
    pub fn bad_args(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        MessageError::BadArgs {
            tag: tag.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the funnel table. All of these are recoverable: host
/// and application versions may drift, so malformed input is an expected
/// condition, never a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunnelError {
    /// The wire value never parsed into an envelope.
    #[error("undecodable envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// The envelope named a module nobody registered.
    #[error("unknown module `{0}`")]
    UnknownModule(String),

    /// The envelope reached its module, whose decoder rejected it.
    #[error("module `{module}`: {error}")]
    Message {
        module: String,
        #[source]
        error: MessageError,
    },

    /// Registration collision in the funnel table.
    #[error("module `{0}` already registered")]
    DuplicateModule(String),
}
