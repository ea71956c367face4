use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::{SmtpReply, Verdict};

/// Reply codes that, combined with an `X.1.1` status, mean the mailbox
/// does not exist. 451 covers greylisting servers that defer unknown users.
const UNKNOWN_MAILBOX_CODES: [u16; 2] = [550, 451];

/// Matches `class.subject.detail` anywhere in a reply line, as long as it
/// is not part of a longer dotted number.
static ENHANCED_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.])([245])\.([0-9]{1,3})\.([0-9]{1,3})(?:$|[^0-9.])")
        .expect("enhanced status pattern compiles")
});

/// RFC 3463 enhanced status code (`X.Y.Z`).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnhancedStatus {
    pub class: u8,
    pub subject: u16,
    pub detail: u16,
}

impl EnhancedStatus {
    /// Finds the first enhanced status code in `text`.
    pub fn find(text: &str) -> Option<Self> {
        let caps = ENHANCED_STATUS.captures(text)?;
        Some(Self {
            class: caps[1].parse().ok()?,
            subject: caps[2].parse().ok()?,
            detail: caps[3].parse().ok()?,
        })
    }

    /// First enhanced status code of any line of `reply`.
    pub fn of(reply: &SmtpReply) -> Option<Self> {
        reply.lines.iter().find_map(|line| Self::find(line))
    }

    /// `X.1.1`: bad destination mailbox address.
    pub fn is_bad_mailbox(&self) -> bool {
        self.subject == 1 && self.detail == 1
    }
}

impl fmt::Display for EnhancedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.class, self.subject, self.detail)
    }
}

/// Maps the reply to `RCPT TO` to a verdict. `None` means the rejection
/// says nothing certain about the mailbox.
pub(crate) fn classify_recipient(reply: &SmtpReply) -> Option<Verdict> {
    if reply.is_positive_completion() {
        return Some(Verdict::Deliverable);
    }
    if is_unknown_mailbox(reply) {
        return Some(Verdict::NotDeliverable);
    }
    None
}

pub(crate) fn is_unknown_mailbox(reply: &SmtpReply) -> bool {
    UNKNOWN_MAILBOX_CODES.contains(&reply.code)
        && EnhancedStatus::of(reply).is_some_and(|status| status.is_bad_mailbox())
}
