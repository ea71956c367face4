use thiserror::Error;

use crate::address::ParseError;
use crate::mx::ResolveError;
use crate::probe::{ErrorKind, ProbeError};

/// Any failure of the end-to-end check: the address, its MX lookup, or the
/// probe itself.
#[derive(Debug, Error)]
pub enum VrfError {
    #[error("invalid address: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl VrfError {
    /// The probe's error kind, if the failure happened during the probe.
    pub fn probe_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Probe(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.probe_kind() == Some(ErrorKind::Timeout)
    }
}
