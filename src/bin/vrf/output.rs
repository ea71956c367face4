use std::process::ExitCode;

use vrf::{ErrorKind, ResolveError, Verification, VrfError};

use crate::args::{Cli, Format};

// codes de sortie
pub const DELIVERABLE: u8 = 0;
pub const NOT_DELIVERABLE: u8 = 1;
pub const USAGE: u8 = 2;
pub const RESOLUTION: u8 = 3;
pub const CONNECTION: u8 = 4;
pub const TIMEOUT: u8 = 5;
pub const PROTOCOL: u8 = 6;

pub fn exit_code(result: &Result<Verification, VrfError>) -> u8 {
    match result {
        Ok(verification) if verification.is_deliverable() => DELIVERABLE,
        Ok(_) => NOT_DELIVERABLE,
        Err(VrfError::Parse(_)) => USAGE,
        // pas de configuration DNS: erreur d'installation, pas de résolution
        Err(VrfError::Resolve(ResolveError::ResolverInit { .. })) => USAGE,
        Err(VrfError::Resolve(_)) => RESOLUTION,
        Err(VrfError::Probe(err)) => match err.kind() {
            ErrorKind::Connection => CONNECTION,
            ErrorKind::Timeout => TIMEOUT,
            ErrorKind::Protocol => PROTOCOL,
        },
    }
}

pub fn human_line(verification: &Verification) -> String {
    format!("{} is {}", verification.address, verification.outcome.verdict)
}

/// Prints the result and returns the process exit status.
pub fn report(cli: &Cli, result: &Result<Verification, VrfError>) -> ExitCode {
    let code = exit_code(result);

    if let Ok(verification) = result {
        // l'erreur de RSET/QUIT ne change pas le verdict
        if let Some(err) = &verification.outcome.teardown {
            tracing::warn!("{}: {err}", verification.address);
        }
    }

    match cli.format {
        Format::Human => write_human(cli, result),
        Format::Json => write_json(cli, result, code),
    }
    ExitCode::from(code)
}

fn write_human(cli: &Cli, result: &Result<Verification, VrfError>) {
    match result {
        Ok(verification) => {
            if !cli.quiet {
                println!("{}", human_line(verification));
            }
        }
        Err(err) => eprintln!("vrf: {}: {err}", cli.address),
    }
}

#[cfg(feature = "with-serde")]
fn write_json(cli: &Cli, result: &Result<Verification, VrfError>, code: u8) {
    let report = JsonReport::new(&cli.address, result, code);
    match serde_json::to_string_pretty(&report) {
        Ok(json) if !cli.quiet => println!("{json}"),
        Ok(_) => {}
        Err(err) => eprintln!("vrf: cannot serialize report: {err}"),
    }
    if let Err(err) = result {
        eprintln!("vrf: {}: {err}", cli.address);
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_json(cli: &Cli, result: &Result<Verification, VrfError>, _code: u8) {
    write_human(cli, result);
}

#[cfg(feature = "with-serde")]
#[derive(serde::Serialize)]
struct JsonReport<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a vrf::EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<vrf::Verdict>,
    deliverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    exchange: Option<&'a vrf::MxRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'a vrf::SmtpReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    teardown_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    transcript: &'a [vrf::SmtpEvent],
    exit_code: u8,
}

#[cfg(feature = "with-serde")]
impl<'a> JsonReport<'a> {
    fn new(input: &'a str, result: &'a Result<Verification, VrfError>, exit_code: u8) -> Self {
        match result {
            Ok(verification) => Self {
                input,
                address: Some(&verification.address),
                verdict: Some(verification.outcome.verdict),
                deliverable: verification.is_deliverable(),
                exchange: Some(&verification.exchange),
                endpoint: Some(verification.endpoint.as_str()),
                reply: Some(&verification.outcome.reply),
                teardown_error: verification.outcome.teardown.as_ref().map(ToString::to_string),
                error: None,
                transcript: &verification.outcome.transcript,
                exit_code,
            },
            Err(err) => Self {
                input,
                address: None,
                verdict: None,
                deliverable: false,
                exchange: None,
                endpoint: None,
                reply: None,
                teardown_error: None,
                error: Some(err.to_string()),
                transcript: &[],
                exit_code,
            },
        }
    }
}
