//! Step-by-step diagnostics.
//!
//! The resolver, the probe and the verifier report what they are doing
//! through an injected [`Trace`] rather than a process-wide logger, so a
//! caller (or a test) decides per instance whether the trace is shown.

use std::fmt;

pub trait Trace: Send + Sync {
    /// A logical step: address parsed, MX selected, command sent...
    fn step(&self, message: fmt::Arguments<'_>);

    /// Something went wrong; the error itself is returned to the caller.
    fn failure(&self, message: fmt::Arguments<'_>);
}

/// Forwards to `tracing` under the `vrf::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTrace;

impl Trace for TracingTrace {
    fn step(&self, message: fmt::Arguments<'_>) {
        tracing::info!(target: "vrf::trace", "{message}");
    }

    fn failure(&self, message: fmt::Arguments<'_>) {
        tracing::warn!(target: "vrf::trace", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Trace for Silent {
    fn step(&self, _message: fmt::Arguments<'_>) {}

    fn failure(&self, _message: fmt::Arguments<'_>) {}
}
