use thiserror::Error;

/// Errors raised to the caller.
///
/// Configuration-file defects and unknown command-line or environment tokens
/// are not part of this enum: they are reported through the
/// [`Logger`](crate::Logger) and the offending line or token is skipped.
#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum OptfigError {
    /// The option set was declared incorrectly or the API was misused.
    #[error("logic error: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::logic)))]
    Logic(String),

    /// A well-formed request for a value that was never populated.
    #[error("undefined value: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::undefined)))]
    Undefined(String),

    /// A stored string could not be converted to the requested type.
    #[error("invalid value '{value}' for option '{option}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::invalid_value)))]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}

impl OptfigError {
    pub(crate) fn logic(msg: impl Into<String>) -> Self {
        Self::Logic(msg.into())
    }

    pub(crate) fn undefined(msg: impl Into<String>) -> Self {
        Self::Undefined(msg.into())
    }
}
