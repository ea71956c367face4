use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError as DnsError, ResolveErrorKind},
    proto::op::ResponseCode,
};

use super::{Error, MxRecord, MxRecords, MxSelection};
use crate::trace::{Trace, TracingTrace};

/// Source of MX records. Implemented for the system [`Resolver`]; tests
/// plug in a stub.
pub trait LookupMx {
    /// Returns the raw records for `domain`. A domain that exists but has
    /// no MX records yields an empty list, not an error.
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if is_no_data(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

/// NOERROR with an empty answer section; NXDOMAIN stays an error.
fn is_no_data(err: &DnsError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound { response_code, .. } if *response_code != ResponseCode::NXDomain
    )
}

/// Resolves a domain to its mail exchangers and picks one of them.
pub struct MxResolver<L = Resolver> {
    lookup: L,
    trace: Arc<dyn Trace>,
    rng: Mutex<StdRng>,
}

impl MxResolver<Resolver> {
    /// Builds a resolver from the system configuration (`/etc/resolv.conf`
    /// or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, Error> {
        let resolver = Resolver::from_system_conf().map_err(Error::resolver_init)?;
        Ok(Self::with_lookup(resolver))
    }
}

impl<L: LookupMx> MxResolver<L> {
    pub fn with_lookup(lookup: L) -> Self {
        Self {
            lookup,
            trace: Arc::new(TracingTrace),
            rng: Mutex::new(StdRng::seed_from_u64(clock_seed())),
        }
    }

    pub fn with_trace(mut self, trace: Arc<dyn Trace>) -> Self {
        self.trace = trace;
        self
    }

    /// Replaces the wall-clock seeded generator used by
    /// [`MxSelection::Random`].
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Looks up the MX records of `domain`, sorted by ascending preference.
    ///
    /// The domain is normalized via IDNA before querying DNS. A lookup that
    /// succeeds without usable records (including a null MX, RFC 7505)
    /// fails with [`Error::NoMx`].
    pub fn resolve_mx(&self, domain: &str) -> Result<MxRecords, Error> {
        let ascii = normalize_domain(domain)?;
        self.trace.step(format_args!("Looking up MX for {ascii}"));
        let records = self
            .lookup
            .lookup_mx(&ascii)
            .map_err(|err| Error::lookup(ascii.as_str(), err))?;
        let records = records
            .into_iter()
            .filter(|record| !record.exchange.is_empty())
            .collect();
        let records = MxRecords::new(records).ok_or_else(|| Error::no_mx(ascii.as_str()))?;
        self.trace
            .step(format_args!("{} MX record(s) for {ascii}", records.as_slice().len()));
        Ok(records)
    }

    /// Picks one exchanger according to `selection`.
    pub fn select<'a>(&self, records: &'a MxRecords, selection: MxSelection) -> &'a MxRecord {
        match selection {
            MxSelection::First => records.first(),
            MxSelection::Random => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                records.random_with(&mut *rng)
            }
        }
    }

    /// Most preferred exchanger for `domain`.
    pub fn first_mx(&self, domain: &str) -> Result<MxRecord, Error> {
        self.pick_mx(domain, MxSelection::First)
    }

    /// A random exchanger for `domain`.
    pub fn random_mx(&self, domain: &str) -> Result<MxRecord, Error> {
        self.pick_mx(domain, MxSelection::Random)
    }

    fn pick_mx(&self, domain: &str, selection: MxSelection) -> Result<MxRecord, Error> {
        let records = self.resolve_mx(domain)?;
        let record = self.select(&records, selection).clone();
        self.trace.step(format_args!("MX host: {}", record.exchange));
        Ok(record)
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}
