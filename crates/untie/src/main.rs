mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "untie", version, about = "Serve and call untied functions over local sockets")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "untie",
            "call",
            "/tmp/test.sock",
            "sum",
            "--args",
            "[1,2]",
            "--secret",
            "s",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.identity, "sum");
                assert_eq!(args.args, "[1,2]");
                assert_eq!(args.timeout, "5s");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn call_requires_identity() {
        let err = Cli::try_parse_from(["untie", "call", "/tmp/test.sock", "--secret", "s"])
            .expect_err("missing identity should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "untie",
            "version",
            "--extended",
            "--log-format",
            "json",
            "--format",
            "raw",
        ])
        .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(ref args) if args.extended));
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.format, Some(OutputFormat::Raw)));
    }
}
