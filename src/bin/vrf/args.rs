use std::time::Duration;

use clap::{Parser, ValueEnum};
use vrf::{EmailAddress, MxSelection, ProbeOptions, SenderPolicy, VerifyOptions};

#[derive(Parser)]
#[command(
    name = "vrf",
    version,
    about = "Checks whether an e-mail address is deliverable, without sending a message"
)]
pub struct Cli {
    /// address to check, e.g. `jane@example.com` or `"Jane Doe <jane@example.com>"`
    pub address: String,

    /// bound on the TCP connect (e.g. 3s, 1m); unbounded when omitted
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// bound on every read/write once connected
    #[arg(long, value_parser = humantime::parse_duration)]
    pub command_timeout: Option<Duration>,

    /// trace each step on stderr
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// print nothing on stdout; the result is the exit status
    #[arg(short, long)]
    pub quiet: bool,

    /// address announced in MAIL FROM
    #[arg(long, env = "VRF_SENDER", default_value = SenderPolicy::DEFAULT_SENDER)]
    pub sender: EmailAddress,

    /// announce the checked address itself in MAIL FROM (overrides --sender)
    #[arg(long)]
    pub sender_is_candidate: bool,

    /// name sent with EHLO/HELO
    #[arg(long, env = "VRF_HELO", default_value = "localhost")]
    pub helo: String,

    /// which MX host to probe
    #[arg(long, value_enum, default_value_t = MxPolicy::First)]
    pub mx: MxPolicy,

    /// SMTP port on the MX host
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// output format (json requires the `with-serde` feature)
    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MxPolicy {
    /// most preferred record
    First,
    /// any record, at random
    Random,
}

impl From<MxPolicy> for MxSelection {
    fn from(policy: MxPolicy) -> Self {
        match policy {
            MxPolicy::First => MxSelection::First,
            MxPolicy::Random => MxSelection::Random,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn verify_options(&self) -> VerifyOptions {
        let sender = if self.sender_is_candidate {
            SenderPolicy::Candidate
        } else {
            SenderPolicy::Placeholder(self.sender.clone())
        };
        VerifyOptions {
            port: self.port,
            selection: self.mx.into(),
            sender,
            probe: ProbeOptions {
                helo_name: self.helo.clone(),
                connect_timeout: self.timeout,
                command_timeout: self.command_timeout,
            },
        }
    }
}
