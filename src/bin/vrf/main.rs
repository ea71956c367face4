mod args;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use vrf::{Silent, Trace, TracingTrace, Verifier};

use crate::args::Cli;
#[cfg(not(feature = "with-serde"))]
use crate::args::Format;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("vrf: {err:#}");
            ExitCode::from(output::USAGE)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    #[cfg(not(feature = "with-serde"))]
    if cli.format == Format::Json {
        anyhow::bail!("--format json nécessite la feature 'with-serde'");
    }

    init_logging(cli.verbose)?;

    // sans --verbose, la trace des étapes est supprimée
    let trace: Arc<dyn Trace> = if cli.verbose {
        Arc::new(TracingTrace)
    } else {
        Arc::new(Silent)
    };

    let result = Verifier::from_system_conf(cli.verify_options())
        .and_then(|verifier| verifier.with_trace(trace).check(&cli.address));
    Ok(output::report(cli, &result))
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("VRF_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("cannot install log subscriber: {err}"))
}
