use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::is_timeout;
use super::{ProbeError, ProbeOptions, SmtpEvent, SmtpReply, Stage};
use crate::trace::Trace;

/// Longest reply line accepted, CRLF included (RFC 5321 §4.5.3.1.5).
pub(crate) const MAX_REPLY_LINE: usize = 512;
/// Most lines accepted in one multi-line reply.
pub(crate) const MAX_REPLY_LINES: usize = 100;

/// One SMTP connection. The socket is closed when the session is dropped.
pub(crate) struct SmtpSession {
    endpoint: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    command_timeout: Option<Duration>,
    trace: Arc<dyn Trace>,
    pub transcript: Vec<SmtpEvent>,
}

impl SmtpSession {
    pub(crate) fn connect(
        endpoint: &str,
        options: &ProbeOptions,
        trace: Arc<dyn Trace>,
    ) -> Result<Self, ProbeError> {
        let addrs: Vec<SocketAddr> = endpoint
            .to_socket_addrs()
            .map_err(|err| ProbeError::endpoint(endpoint, err))?
            .collect();
        if addrs.is_empty() {
            return Err(ProbeError::endpoint(
                endpoint,
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address"),
            ));
        }

        let stream = match options.connect_timeout {
            Some(timeout) => connect_within(endpoint, &addrs, timeout)?,
            None => {
                TcpStream::connect(addrs.as_slice()).map_err(|err| ProbeError::connect(endpoint, err))?
            }
        };

        let command_timeout = options.socket_timeout();
        let setup = |err: io::Error| ProbeError::io(endpoint, Stage::Connect, err);
        stream.set_read_timeout(command_timeout).map_err(setup)?;
        stream.set_write_timeout(command_timeout).map_err(setup)?;
        let reader = BufReader::new(stream.try_clone().map_err(setup)?);

        Ok(Self {
            endpoint: endpoint.to_string(),
            stream,
            reader,
            command_timeout,
            trace,
            transcript: Vec::new(),
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `command` and reads the reply.
    pub(crate) fn command(&mut self, stage: Stage, command: &str) -> Result<SmtpReply, ProbeError> {
        self.send(stage, command)?;
        self.read_reply(stage)
    }

    pub(crate) fn send(&mut self, stage: Stage, command: &str) -> Result<(), ProbeError> {
        if command.contains(['\r', '\n']) {
            return Err(ProbeError::malformed(
                &self.endpoint,
                stage,
                format!("refusing to send a command with a line break: {command:?}"),
            ));
        }
        self.trace.step(format_args!("{command}"));
        self.transcript.push(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&line)
            .and_then(|()| self.stream.flush())
            .map_err(|err| self.io_error(stage, err))
    }

    pub(crate) fn read_reply(&mut self, stage: Stage) -> Result<SmtpReply, ProbeError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::malformed(
                    &self.endpoint,
                    stage,
                    format!("reply longer than {MAX_REPLY_LINES} lines"),
                ));
            }
            let mut raw = Vec::new();
            let read = (&mut self.reader)
                .take(MAX_REPLY_LINE as u64 + 1)
                .read_until(b'\n', &mut raw);
            let read = read.map_err(|err| self.io_error(stage, err))?;
            if read == 0 {
                return Err(self.io_error(
                    stage,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed while reading reply",
                    ),
                ));
            }
            if raw.len() > MAX_REPLY_LINE {
                return Err(ProbeError::malformed(
                    &self.endpoint,
                    stage,
                    format!("reply line longer than {MAX_REPLY_LINE} bytes"),
                ));
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);

            let (parsed_code, continuation, text) = split_reply_line(line)
                .ok_or_else(|| ProbeError::malformed(&self.endpoint, stage, format!("invalid SMTP reply: '{line}'")))?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(ProbeError::malformed(
                        &self.endpoint,
                        stage,
                        format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                    ));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            lines.push(text.to_string());
            if !continuation {
                break;
            }
        }

        let reply = SmtpReply {
            code: code.unwrap_or_default(),
            lines,
        };
        self.trace.step(format_args!("{reply}"));
        self.transcript.push(SmtpEvent::Received {
            stage,
            reply: reply.clone(),
        });
        Ok(reply)
    }

    fn io_error(&self, stage: Stage, err: io::Error) -> ProbeError {
        match self.command_timeout {
            Some(after) if is_timeout(&err) => ProbeError::timeout(&self.endpoint, stage, after),
            _ => ProbeError::io(&self.endpoint, stage, err),
        }
    }
}

/// Splits `250-text` / `250 text` / `250` into code, continuation flag and
/// text.
fn split_reply_line(line: &str) -> Option<(u16, bool, &str)> {
    let digits = line.get(..3)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = digits.parse::<u16>().ok()?;
    if !(100..600).contains(&code) {
        return None;
    }
    match line.as_bytes().get(3) {
        None => Some((code, false, "")),
        Some(b'-') => Some((code, true, &line[4..])),
        Some(b' ') => Some((code, false, &line[4..])),
        Some(_) => None,
    }
}

/// Tries every address until one answers, all within `timeout`.
fn connect_within(
    endpoint: &str,
    addrs: &[SocketAddr],
    timeout: Duration,
) -> Result<TcpStream, ProbeError> {
    let deadline = Instant::now() + timeout;
    let mut last_err = None;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProbeError::timeout(endpoint, Stage::Connect, timeout));
        }
        match TcpStream::connect_timeout(addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) if is_timeout(&err) => Err(ProbeError::timeout(endpoint, Stage::Connect, timeout)),
        Some(err) => Err(ProbeError::connect(endpoint, err)),
        None => Err(ProbeError::timeout(endpoint, Stage::Connect, timeout)),
    }
}
