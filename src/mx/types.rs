use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// `host:port` endpoint for this exchanger.
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}:{port}", self.exchange)
    }
}

impl fmt::Display for MxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (preference {})", self.exchange, self.preference)
    }
}

/// How a single exchanger is picked out of [`MxRecords`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MxSelection {
    /// The most preferred record (lowest preference value).
    #[default]
    First,
    /// Any record, uniformly at random.
    Random,
}

/// A non-empty list of MX records, sorted by ascending preference.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecords(Vec<MxRecord>);

impl MxRecords {
    /// Sorts and deduplicates `records`; returns `None` when nothing is left.
    pub fn new(mut records: Vec<MxRecord>) -> Option<Self> {
        records.sort();
        records.dedup();
        if records.is_empty() {
            None
        } else {
            Some(Self(records))
        }
    }

    pub fn first(&self) -> &MxRecord {
        &self.0[0]
    }

    pub fn random_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &MxRecord {
        self.0.choose(rng).unwrap_or_else(|| self.first())
    }

    pub fn as_slice(&self) -> &[MxRecord] {
        &self.0
    }
}
