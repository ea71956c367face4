#![forbid(unsafe_code)]
//! vrf: checks whether an e-mail address is deliverable by walking the SMTP
//! dialogue up to `RCPT TO`, without sending a message.

pub mod address;
pub mod error;
pub mod mx;
pub mod probe;
pub mod trace;
pub mod verify;

pub use address::{EmailAddress, ParseError};
pub use error::VrfError;
pub use mx::{LookupMx, MxRecord, MxRecords, MxResolver, MxSelection, ResolveError};
pub use probe::{
    EnhancedStatus, ErrorKind, ProbeError, ProbeOptions, ProbeOutcome, Prober, SmtpEvent,
    SmtpReply, Stage, Verdict, probe,
};
pub use trace::{Silent, Trace, TracingTrace};
pub use verify::{SenderPolicy, Verification, Verifier, VerifyOptions, is_deliverable};
