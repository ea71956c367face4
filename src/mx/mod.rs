//! DNS MX resolution and exchanger selection.
//!
//! [`MxResolver::resolve_mx`] returns the records of a domain sorted by
//! preference; [`MxResolver::select`] picks either the most preferred one
//! ([`MxSelection::First`]) or a random one ([`MxSelection::Random`]).

mod error;
mod resolver;
mod types;

pub use error::ResolveError;
pub use resolver::{LookupMx, MxResolver};
pub use types::{MxRecord, MxRecords, MxSelection};

pub(crate) use error::ResolveError as Error;
