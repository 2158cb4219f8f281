use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use soapfix_core::{SessionConfig, SoapVersion};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter};

use crate::http_client::TransportConfig;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Sets up a panic hook so panics end up in the log.
fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!("A panic occurred: {}", panic_info);
    }));
}

/// SOAP fixture script runner
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Fixture script to run
    #[arg(help = "Path of the fixture script")]
    pub script: PathBuf,

    #[arg(long, help = "SOAP version of the requests", default_value_t = SoapVersionArg::V11)]
    pub soap_version: SoapVersionArg,

    #[arg(long, default_value = "30", help = "Connect timeout in seconds")]
    pub connect_timeout: u64,

    #[arg(long, default_value = "60", help = "Read timeout in seconds")]
    pub read_timeout: u64,

    #[arg(long, default_value = "  ", help = "Indentation used when printing messages")]
    pub indent: String,

    /// Write logs to this file instead of stderr
    #[arg(long, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase logging verbosity")]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SoapVersionArg {
    #[value(name = "1.1")]
    V11,
    #[value(name = "1.2")]
    V12,
}

impl std::fmt::Display for SoapVersionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V11 => write!(f, "1.1"),
            Self::V12 => write!(f, "1.2"),
        }
    }
}

impl From<SoapVersionArg> for SoapVersion {
    fn from(value: SoapVersionArg) -> Self {
        match value {
            SoapVersionArg::V11 => SoapVersion::V11,
            SoapVersionArg::V12 => SoapVersion::V12,
        }
    }
}

/// Filter directives for a `-v` count.
pub fn filter_for_verbosity(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,soapfix=info,ureq=error",
        1 => "info,soapfix_core=debug,soapfix=debug,ureq=warn",
        2 => "debug,ureq=info",
        _ => "trace",
    }
}

/// Initialize logging to stderr or to `log_file`.
pub fn init_logging(verbose_level: u8, log_file: Option<&Path>) -> anyhow::Result<()> {
    setup_panic_hook();

    // Bridge logs from the `log` crate (ureq) to `tracing`
    LogTracer::init().ok();

    let (nb_writer, guard) = match log_file {
        Some(path) => tracing_appender::non_blocking(std::fs::File::create(path)?),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    if LOG_GUARD.set(guard).is_err() {
        tracing::warn!("LOG_GUARD was already set. This may indicate a problem in initialization.");
    }

    let env_filter = EnvFilter::new(filter_for_verbosity(verbose_level));

    let subscriber = Registry::default().with(env_filter).with(
        fmt::layer()
            .with_writer(nb_writer)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .compact(),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Logging system initialized.");

    Ok(())
}

pub fn create_session_config(args: &Args) -> SessionConfig {
    SessionConfig::builder()
        .version(args.soap_version.into())
        .indent(args.indent.clone())
        .build()
}

pub fn create_transport_config(args: &Args) -> TransportConfig {
    TransportConfig::builder()
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .read_timeout(Duration::from_secs(args.read_timeout))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["soapfix", "orders.soap"]);

        assert_eq!(args.script, PathBuf::from("orders.soap"));
        assert_eq!(args.soap_version, SoapVersionArg::V11);
        assert_eq!(args.verbose, 0);

        let session = create_session_config(&args);
        assert_eq!(session.version, SoapVersion::V11);
        assert_eq!(session.indent, "  ");

        let transport = create_transport_config(&args);
        assert_eq!(transport.connect_timeout, Duration::from_secs(30));
        assert_eq!(transport.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "soapfix",
            "orders.soap",
            "--soap-version",
            "1.2",
            "--read-timeout",
            "5",
            "-vv",
            "--log-file",
            "run.log",
        ]);

        assert_eq!(create_session_config(&args).version, SoapVersion::V12);
        assert_eq!(create_transport_config(&args).read_timeout, Duration::from_secs(5));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_file.as_deref(), Some(Path::new("run.log")));
        assert_eq!(filter_for_verbosity(args.verbose), "debug,ureq=info");
    }
}
