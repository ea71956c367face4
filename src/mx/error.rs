use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("no MX for domain {domain}")]
    NoMx { domain: String },
}

impl ResolveError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn lookup(
        domain: impl Into<String>,
        source: trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::Lookup {
            domain: domain.into(),
            source,
        }
    }

    pub(crate) fn no_mx(domain: impl Into<String>) -> Self {
        Self::NoMx {
            domain: domain.into(),
        }
    }

    /// `true` when the lookup worked but the domain has no mail exchanger.
    pub fn is_no_mx(&self) -> bool {
        matches!(self, Self::NoMx { .. })
    }
}
