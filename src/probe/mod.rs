//! SMTP deliverability probe.
//!
//! [`Prober::probe`] connects to one mail exchanger, walks the dialogue up to
//! `RCPT TO` and stops there:
//!
//! ```text
//! connect -> 220 greeting -> EHLO/HELO -> MAIL FROM -> RCPT TO -> RSET -> QUIT
//! ```
//!
//! An accepted recipient is [`Verdict::Deliverable`]; a `550`/`451` reply
//! carrying an `X.1.1` status is [`Verdict::NotDeliverable`]. Every other
//! rejection is a [`ProbeError`]: the mailbox may or may not exist. No
//! message is ever transferred.

mod error;
mod options;
mod session;
mod status;
mod types;

pub use error::{ErrorKind, ProbeError};
pub use options::ProbeOptions;
pub use status::EnhancedStatus;
pub use types::{ProbeOutcome, SmtpEvent, SmtpReply, Stage, Verdict};

use std::sync::Arc;
use std::time::Duration;

use crate::address::EmailAddress;
use crate::trace::{Trace, TracingTrace};
use session::SmtpSession;

/// Probes a single endpoint with default options and the given connect
/// timeout.
pub fn probe(
    endpoint: &str,
    sender: &EmailAddress,
    recipient: &EmailAddress,
    timeout: Option<Duration>,
) -> Result<ProbeOutcome, ProbeError> {
    Prober::new(ProbeOptions::default().with_connect_timeout(timeout)).probe(
        endpoint,
        sender,
        recipient,
    )
}

/// Drives the SMTP dialogue against one endpoint.
pub struct Prober {
    options: ProbeOptions,
    trace: Arc<dyn Trace>,
}

impl Prober {
    pub fn new(options: ProbeOptions) -> Self {
        Self {
            options,
            trace: Arc::new(TracingTrace),
        }
    }

    pub fn with_trace(mut self, trace: Arc<dyn Trace>) -> Self {
        self.trace = trace;
        self
    }

    /// Opens one connection to `endpoint` (`host:port`) and asks whether
    /// `recipient` would be accepted from `sender`.
    ///
    /// Once a verdict is reached, `RSET` and `QUIT` are always sent; if they
    /// fail, the verdict is still returned and the failure is kept in
    /// [`ProbeOutcome::teardown`].
    pub fn probe(
        &self,
        endpoint: &str,
        sender: &EmailAddress,
        recipient: &EmailAddress,
    ) -> Result<ProbeOutcome, ProbeError> {
        self.trace.step(format_args!("Connecting to {endpoint}..."));
        let mut session = SmtpSession::connect(endpoint, &self.options, Arc::clone(&self.trace))
            .inspect_err(|err| self.trace.failure(format_args!("Error on connect: {err}")))?;
        self.trace.step(format_args!("Connected."));

        let mut transaction = false;
        match self.converse(&mut session, sender, recipient, &mut transaction) {
            Ok((verdict, reply)) => {
                let teardown = self.teardown(&mut session).err();
                Ok(ProbeOutcome {
                    verdict,
                    reply,
                    teardown,
                    transcript: std::mem::take(&mut session.transcript),
                })
            }
            Err(err) => {
                self.trace
                    .failure(format_args!("Error on {}: {err}", err.stage()));
                if err.connection_usable() {
                    self.abort(&mut session, transaction);
                }
                Err(err)
            }
        }
    }

    fn converse(
        &self,
        session: &mut SmtpSession,
        sender: &EmailAddress,
        recipient: &EmailAddress,
        transaction: &mut bool,
    ) -> Result<(Verdict, SmtpReply), ProbeError> {
        let greeting = session.read_reply(Stage::Greeting)?;
        if greeting.code != 220 {
            return Err(ProbeError::rejected(session.endpoint(), Stage::Greeting, greeting));
        }

        self.hello(session)?;

        let mail = session.command(Stage::MailFrom, &format!("MAIL FROM:<{}>", sender.envelope()))?;
        if !mail.is_positive_completion() {
            return Err(ProbeError::rejected(session.endpoint(), Stage::MailFrom, mail));
        }
        *transaction = true;

        let rcpt = session.command(Stage::RcptTo, &format!("RCPT TO:<{}>", recipient.envelope()))?;
        match status::classify_recipient(&rcpt) {
            Some(verdict) => {
                self.trace
                    .step(format_args!("{} is {verdict}", recipient.address()));
                Ok((verdict, rcpt))
            }
            None => Err(ProbeError::rejected(session.endpoint(), Stage::RcptTo, rcpt)),
        }
    }

    /// `EHLO`, falling back to `HELO` for servers that refuse it.
    fn hello(&self, session: &mut SmtpSession) -> Result<(), ProbeError> {
        let name = self.options.helo_name();
        let ehlo = session.command(Stage::Hello, &format!("EHLO {name}"))?;
        if ehlo.is_positive_completion() {
            return Ok(());
        }
        let helo = session.command(Stage::Hello, &format!("HELO {name}"))?;
        if helo.is_positive_completion() {
            Ok(())
        } else {
            Err(ProbeError::rejected(session.endpoint(), Stage::Hello, helo))
        }
    }

    /// `RSET` then `QUIT`; the first failure is returned.
    fn teardown(&self, session: &mut SmtpSession) -> Result<(), ProbeError> {
        let reset = expect_code(session, Stage::Reset, "RSET", 250).map(drop);
        if let Err(err) = &reset {
            self.trace.failure(format_args!("Error on RSET: {err}"));
            if !err.connection_usable() {
                return reset;
            }
        }
        let quit = expect_code(session, Stage::Quit, "QUIT", 221).map(drop);
        if let Err(err) = &quit {
            self.trace.failure(format_args!("Error on QUIT: {err}"));
        }
        reset.and(quit)
    }

    /// Best-effort cleanup after a protocol error; failures are only traced.
    fn abort(&self, session: &mut SmtpSession, transaction: bool) {
        if transaction {
            if let Err(err) = expect_code(session, Stage::Reset, "RSET", 250) {
                self.trace.failure(format_args!("Error on RSET: {err}"));
                if !err.connection_usable() {
                    return;
                }
            }
        }
        if let Err(err) = expect_code(session, Stage::Quit, "QUIT", 221) {
            self.trace.failure(format_args!("Error on QUIT: {err}"));
        }
    }
}

fn expect_code(
    session: &mut SmtpSession,
    stage: Stage,
    command: &str,
    expected: u16,
) -> Result<SmtpReply, ProbeError> {
    let reply = session.command(stage, command)?;
    if reply.code == expected {
        Ok(reply)
    } else {
        Err(ProbeError::rejected(session.endpoint(), stage, reply))
    }
}

#[cfg(test)]
pub(crate) mod tests;
