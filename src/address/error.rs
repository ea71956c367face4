use thiserror::Error;

/// Errors raised while parsing an RFC 5322 mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("address is empty")]
    Empty,
    #[error("missing '@' in address")]
    MissingAt,
    #[error("local part is empty")]
    EmptyLocalPart,
    #[error("domain is empty")]
    EmptyDomain,
    #[error("invalid local part '{local}'")]
    InvalidLocalPart { local: String },
    #[error("invalid domain '{domain}'")]
    InvalidDomain { domain: String },
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("missing '>' after address")]
    UnclosedAngle,
    #[error("unexpected character '{ch}' at offset {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("unexpected trailing input '{rest}'")]
    TrailingInput { rest: String },
}

impl ParseError {
    pub(crate) fn invalid_local(local: impl Into<String>) -> Self {
        Self::InvalidLocalPart {
            local: local.into(),
        }
    }

    pub(crate) fn invalid_domain(domain: impl Into<String>) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
        }
    }

    pub(crate) fn trailing(rest: impl Into<String>) -> Self {
        Self::TrailingInput { rest: rest.into() }
    }
}
