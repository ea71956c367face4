use std::time::Duration;

/// Configuration knobs for [`Prober`](super::Prober).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Name announced with `EHLO`/`HELO`.
    pub helo_name: String,
    /// Bound on establishing the TCP connection. `None` leaves it to the
    /// operating system.
    pub connect_timeout: Option<Duration>,
    /// Bound on each read and write once connected. `None` (the default)
    /// leaves the exchange unbounded.
    pub command_timeout: Option<Duration>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_name: "localhost".to_string(),
            connect_timeout: None,
            command_timeout: None,
        }
    }
}

impl ProbeOptions {
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub(crate) fn helo_name(&self) -> &str {
        let name = self.helo_name.trim();
        if name.is_empty() { "localhost" } else { name }
    }

    /// A zero duration cannot be given to a socket; treat it as unset.
    pub(crate) fn socket_timeout(&self) -> Option<Duration> {
        self.command_timeout.filter(|timeout| !timeout.is_zero())
    }
}
