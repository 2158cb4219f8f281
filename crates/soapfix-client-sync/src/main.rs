use std::io;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use soapfix_client_sync::config::{
    create_session_config, create_transport_config, init_logging, Args,
};
use soapfix_client_sync::http_client::UreqTransport;
use soapfix_client_sync::script::{parse_script, ScriptRunner};
use soapfix_core::SoapSession;
use tracing::{error, info, instrument};

#[instrument(name = "main", level = "info")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging. If it fails, we can't log, so just print and exit.
    if let Err(e) = init_logging(args.verbose, args.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run_app(&args) {
        error!("Application failed to run: {:?}", e);
        return Err(e);
    }

    Ok(())
}

fn run_app(args: &Args) -> anyhow::Result<()> {
    info!(script = %args.script.display(), soap_version = %args.soap_version, "starting fixture run");

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let script = parse_script(&text)
        .with_context(|| format!("invalid script {}", args.script.display()))?;

    let transport = UreqTransport::new(&create_transport_config(args))
        .context("failed to set up TLS for the HTTP transport")?;
    let session = SoapSession::with_config(transport, create_session_config(args));

    let base_dir = args.script.parent().unwrap_or_else(|| Path::new("."));
    let mut runner = ScriptRunner::new(session, io::stdout(), base_dir);
    let report = runner.run(&script);

    println!("{report}");
    info!(steps = report.outcomes.len(), passed = report.passed(), "fixture run finished");

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} steps failed",
            report.outcomes.len() - report.passed(),
            report.outcomes.len()
        );
    }
    Ok(())
}
