//! RFC 5322 mailbox parsing.
//!
//! [`EmailAddress::parse`] accepts both the bare `local@domain` form and the
//! `Display Name <local@domain>` form. The resulting value is immutable and
//! always holds a non-empty local part and a non-empty domain.

mod domain;
mod error;
mod local;
mod parser;

pub use error::ParseError;

use std::fmt;
use std::str::FromStr;

use local::canonical_local;

/// A validated e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    address: String,
    local: String,
    domain: String,
    ascii_domain: String,
    display_name: Option<String>,
}

impl EmailAddress {
    /// Parses `raw` into an [`EmailAddress`].
    ///
    /// A local part may only contain `@` inside a quoted string, so the
    /// domain is always the text after the last unescaped `@`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mailbox = parser::parse_mailbox(raw)?;
        let ascii_domain = domain::ascii_domain(&mailbox.domain)?;
        let local = canonical_local(&mailbox.local);
        let address = format!("{local}@{}", mailbox.domain);
        Ok(Self {
            address,
            local,
            domain: mailbox.domain,
            ascii_domain,
            display_name: mailbox.display_name,
        })
    }

    /// The bare `local@domain` form.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The local part, quoted when it is not a dot-atom.
    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The domain in its IDNA (punycode) form, as used for DNS and the
    /// SMTP envelope. Domain literals are returned unchanged.
    pub fn ascii_domain(&self) -> &str {
        &self.ascii_domain
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The address used in `MAIL FROM`/`RCPT TO` paths.
    pub fn envelope(&self) -> String {
        format!("{}@{}", self.local, self.ascii_domain)
    }

    pub fn is_domain_literal(&self) -> bool {
        domain::is_domain_literal(&self.domain)
    }
}

impl FromStr for EmailAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(feature = "with-serde")]
impl serde::Serialize for EmailAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.address)
    }
}
