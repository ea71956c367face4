//! End-to-end check: parse the address, pick an exchanger, probe it.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use trust_dns_resolver::Resolver;

use crate::address::EmailAddress;
use crate::error::VrfError;
use crate::mx::{LookupMx, MxRecord, MxResolver, MxSelection};
use crate::probe::{ProbeOptions, ProbeOutcome, Prober};
use crate::trace::{Trace, TracingTrace};

/// Address declared in `MAIL FROM` while probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderPolicy {
    /// A fixed sender, `postmaster@localhost` by default. The candidate's
    /// own domain policies then cannot reject the sender stage.
    Placeholder(EmailAddress),
    /// The candidate address announces itself as sender.
    Candidate,
}

impl SenderPolicy {
    pub const DEFAULT_SENDER: &'static str = "postmaster@localhost";

    pub fn sender<'a>(&'a self, recipient: &'a EmailAddress) -> &'a EmailAddress {
        match self {
            Self::Placeholder(sender) => sender,
            Self::Candidate => recipient,
        }
    }
}

impl Default for SenderPolicy {
    fn default() -> Self {
        let sender = EmailAddress::parse(Self::DEFAULT_SENDER)
            .expect("default placeholder sender is a valid address");
        Self::Placeholder(sender)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// SMTP port on the exchanger, 25 unless testing.
    pub port: u16,
    pub selection: MxSelection,
    pub sender: SenderPolicy,
    pub probe: ProbeOptions,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            port: 25,
            selection: MxSelection::First,
            sender: SenderPolicy::default(),
            probe: ProbeOptions::default(),
        }
    }
}

/// Everything learned about one address.
#[derive(Debug)]
pub struct Verification {
    pub address: EmailAddress,
    /// The exchanger that was probed.
    pub exchange: MxRecord,
    pub endpoint: String,
    pub outcome: ProbeOutcome,
}

impl Verification {
    pub fn is_deliverable(&self) -> bool {
        self.outcome.is_deliverable()
    }
}

pub struct Verifier<L = Resolver> {
    resolver: MxResolver<L>,
    prober: Prober,
    options: VerifyOptions,
    trace: Arc<dyn Trace>,
}

impl Verifier<Resolver> {
    pub fn from_system_conf(options: VerifyOptions) -> Result<Self, VrfError> {
        Ok(Self::new(MxResolver::from_system_conf()?, options))
    }
}

impl<L: LookupMx> Verifier<L> {
    pub fn new(resolver: MxResolver<L>, options: VerifyOptions) -> Self {
        Self {
            resolver,
            prober: Prober::new(options.probe.clone()),
            options,
            trace: Arc::new(TracingTrace),
        }
    }

    /// Routes the resolver, the prober and the verifier's own steps to
    /// `trace`.
    pub fn with_trace(self, trace: Arc<dyn Trace>) -> Self {
        let Self {
            resolver,
            prober,
            options,
            ..
        } = self;
        Self {
            resolver: resolver.with_trace(Arc::clone(&trace)),
            prober: prober.with_trace(Arc::clone(&trace)),
            options,
            trace,
        }
    }

    /// Parses `raw`, selects one exchanger for its domain and probes it.
    ///
    /// A domain literal (`user@[192.0.2.1]`) is probed directly, without
    /// an MX lookup.
    pub fn check(&self, raw: &str) -> Result<Verification, VrfError> {
        let address = EmailAddress::parse(raw)
            .inspect_err(|err| self.trace.failure(format_args!("Invalid address {raw:?}: {err}")))?;
        self.trace.step(format_args!("Address: {address}"));
        self.trace.step(format_args!("Domain: {}", address.domain()));

        let (exchange, endpoint) = match literal_ip(address.domain()) {
            Some(ip) => (
                MxRecord::new(0, ip.to_string()),
                SocketAddr::new(ip, self.options.port).to_string(),
            ),
            None => {
                let records = self
                    .resolver
                    .resolve_mx(address.ascii_domain())
                    .inspect_err(|err| self.trace.failure(format_args!("{err}")))?;
                let record = self.resolver.select(&records, self.options.selection).clone();
                let endpoint = record.endpoint(self.options.port);
                (record, endpoint)
            }
        };
        self.trace.step(format_args!("MX host: {exchange}"));

        let sender = self.options.sender.sender(&address);
        let outcome = self.prober.probe(&endpoint, sender, &address)?;
        Ok(Verification {
            address,
            exchange,
            endpoint,
            outcome,
        })
    }
}

/// Checks `raw` with the system resolver, the most preferred exchanger and
/// the given connect timeout.
pub fn is_deliverable(raw: &str, timeout: Option<Duration>) -> Result<bool, VrfError> {
    let options = VerifyOptions {
        probe: ProbeOptions::default().with_connect_timeout(timeout),
        ..VerifyOptions::default()
    };
    let verification = Verifier::from_system_conf(options)?.check(raw)?;
    Ok(verification.is_deliverable())
}

/// `[192.0.2.1]` or `[IPv6:2001:db8::1]`.
fn literal_ip(domain: &str) -> Option<IpAddr> {
    let inner = domain.strip_prefix('[')?.strip_suffix(']')?;
    let inner = inner
        .strip_prefix("IPv6:")
        .or_else(|| inner.strip_prefix("ipv6:"))
        .unwrap_or(inner);
    inner.parse().ok()
}
