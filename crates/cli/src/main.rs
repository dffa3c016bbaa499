mod check;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ErrorLevel {
    Error,
    Warning,
}

/// Checks that tryCatch results are destructured as [result, error].
#[derive(Parser)]
#[command(
    name = "trytuple",
    version,
    about = "Checks that tryCatch results are destructured as [result, error]"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check script files or directories
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Path to a trytuple.toml (default: ./trytuple.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Severity of reported problems
        #[arg(long, value_enum)]
        error_level: Option<ErrorLevel>,
        /// Accept `[result, ,]` as a valid destructuring
        #[arg(long, value_name = "BOOL")]
        allow_ignored_error: Option<bool>,
        /// Also check calls whose result type is a tryCatch result
        #[arg(long, value_name = "BOOL")]
        check_wrapped_calls: Option<bool>,
        /// Rewrite offending patterns as [result, error] in place
        #[arg(long)]
        fix: bool,
    },

    /// Start the Language Server Protocol server over stdio
    Lsp,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            paths,
            config,
            error_level,
            allow_ignored_error,
            check_wrapped_calls,
            fix,
        } => {
            let options = check::CheckOptions {
                paths: &paths,
                config: config.as_deref(),
                error_level,
                allow_ignored_error,
                check_wrapped_calls,
                fix,
                output: cli.output,
                quiet: cli.quiet,
            };
            process::exit(check::cmd_check(options));
        }
        Commands::Lsp => {
            if let Err(e) = trytuple_lsp::run() {
                report_error(&format!("LSP server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr; stdout carries reports and the LSP transport.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TRYTUPLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
