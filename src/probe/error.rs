use std::io;
use std::time::Duration;

use thiserror::Error;

use super::{SmtpReply, Stage};

/// Coarse classification of a [`ProbeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote host could not be reached.
    Connection,
    /// The remote host was too slow; often transient.
    Timeout,
    /// The server answered, but not in a way that tells anything about the
    /// recipient.
    Protocol,
}

/// Errors that leave deliverability undetermined.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot resolve endpoint {endpoint}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("request timeout: {stage} with {endpoint} took longer than {}", humantime::format_duration(*.after))]
    Timeout {
        endpoint: String,
        stage: Stage,
        after: Duration,
    },
    #[error("{stage} rejected by {endpoint}: {reply}")]
    Rejected {
        endpoint: String,
        stage: Stage,
        reply: SmtpReply,
    },
    #[error("malformed reply from {endpoint} during {stage}: {message}")]
    Malformed {
        endpoint: String,
        stage: Stage,
        message: String,
    },
    #[error("I/O error with {endpoint} during {stage}: {source}")]
    Io {
        endpoint: String,
        stage: Stage,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Endpoint { .. } | Self::Connect { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Rejected { .. } | Self::Malformed { .. } | Self::Io { .. } => ErrorKind::Protocol,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Endpoint { .. } | Self::Connect { .. } => Stage::Connect,
            Self::Timeout { stage, .. }
            | Self::Rejected { stage, .. }
            | Self::Malformed { stage, .. }
            | Self::Io { stage, .. } => *stage,
        }
    }

    /// The server reply behind a [`ProbeError::Rejected`].
    pub fn reply(&self) -> Option<&SmtpReply> {
        match self {
            Self::Rejected { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Whether the connection may still be used to send `RSET`/`QUIT`.
    pub(crate) fn connection_usable(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Malformed { .. })
    }

    pub(crate) fn endpoint(endpoint: &str, source: io::Error) -> Self {
        Self::Endpoint {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub(crate) fn connect(endpoint: &str, source: io::Error) -> Self {
        Self::Connect {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub(crate) fn timeout(endpoint: &str, stage: Stage, after: Duration) -> Self {
        Self::Timeout {
            endpoint: endpoint.to_string(),
            stage,
            after,
        }
    }

    pub(crate) fn rejected(endpoint: &str, stage: Stage, reply: SmtpReply) -> Self {
        Self::Rejected {
            endpoint: endpoint.to_string(),
            stage,
            reply,
        }
    }

    pub(crate) fn malformed(endpoint: &str, stage: Stage, message: impl Into<String>) -> Self {
        Self::Malformed {
            endpoint: endpoint.to_string(),
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn io(endpoint: &str, stage: Stage, source: io::Error) -> Self {
        Self::Io {
            endpoint: endpoint.to_string(),
            stage,
            source,
        }
    }
}

pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
