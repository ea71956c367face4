use std::fmt;

use super::ProbeError;

/// Step of the SMTP dialogue a command, reply or error belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Greeting,
    Hello,
    MailFrom,
    RcptTo,
    Reset,
    Quit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Hello => "EHLO/HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Reset => "RSET",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            lines: message.lines().map(str::to_string).collect(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        for line in &self.lines {
            write!(f, " {line}")?;
        }
        Ok(())
    }
}

/// A recorded SMTP transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent { stage: Stage, command: String },
    Received { stage: Stage, reply: SmtpReply },
}

impl SmtpEvent {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Sent { stage, .. } | Self::Received { stage, .. } => *stage,
        }
    }
}

/// What the recipient declaration told us about the mailbox.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `RCPT TO` was accepted.
    Deliverable,
    /// `RCPT TO` was refused with a bad-mailbox (`X.1.1`) status.
    NotDeliverable,
}

impl Verdict {
    pub fn is_deliverable(self) -> bool {
        matches!(self, Self::Deliverable)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliverable => f.write_str("deliverable"),
            Self::NotDeliverable => f.write_str("not deliverable"),
        }
    }
}

/// Result of one probe that reached a verdict.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub verdict: Verdict,
    /// The server's answer to `RCPT TO`.
    pub reply: SmtpReply,
    /// Set when `RSET`/`QUIT` failed after the verdict was known.
    pub teardown: Option<ProbeError>,
    pub transcript: Vec<SmtpEvent>,
}

impl ProbeOutcome {
    pub fn is_deliverable(&self) -> bool {
        self.verdict.is_deliverable()
    }
}
