//! Tattle: test run capture and report CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tattle::capture::{self, CaptureOptions};
use tattle::config::load_config;
use tattle::reporter::{ConsoleReporter, HtmlReporter};
use tattle::viewer::store::ReportStore;
use tattle::viewer::tree::wrap_capture;
use tattle::TestCapture;

/// Capture test runs and render interactive reports
#[derive(Parser, Debug)]
#[command(name = "tattle")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input filename (or - for stdin)
    #[arg(long, short, global = true, default_value = "-")]
    input: String,

    /// Emulate the run time of the test report (useful for development)
    #[arg(long, short, global = true)]
    emulate: bool,

    /// Report title
    #[arg(long, global = true)]
    title: Option<String>,

    /// Path to config file (default: search .tattlerc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Quiet mode (failed tests only)
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Include captured output for failed tests
    #[arg(long, global = true)]
    show_output: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an HTML test report
    #[command(alias = "gen")]
    Generate {
        /// Output filename (or - for stdout)
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Load a generated report page and print its view tree
    View {
        /// Path to a generated report page
        report: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let work_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&work_dir, args.config.as_deref())?;
    let title = args
        .title
        .clone()
        .or_else(|| config.title.clone())
        .unwrap_or_else(|| "Test Report".to_string());
    let emulate = args.emulate || config.emulate;

    match args.command {
        Some(Commands::View { ref report }) => run_view(&args, report),
        Some(Commands::Generate { ref output }) => {
            let capture = read_capture(&args.input, title, emulate)?;
            let output = output
                .clone()
                .or_else(|| config.output.as_ref().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "-".to_string());
            run_generate(&capture, &output)
        }
        None => {
            let capture = read_capture(&args.input, title, emulate)?;
            run_summary(&args, capture)
        }
    }
}

/// Read the event stream from a file or stdin into a capture
fn read_capture(input: &str, title: String, emulate: bool) -> Result<TestCapture> {
    let options = CaptureOptions { title, emulate };
    let capture = if input == "-" {
        capture::read(io::stdin().lock(), options)
    } else {
        let file =
            File::open(input).with_context(|| format!("Failed to open input: {input}"))?;
        capture::read(BufReader::new(file), options)
    };
    capture.context("Failed to read test output")
}

fn run_summary(args: &Args, capture: TestCapture) -> Result<ExitCode> {
    let view = wrap_capture(capture);
    let reporter = if args.show_output {
        ConsoleReporter::new().with_output()
    } else {
        ConsoleReporter::new()
    };
    if args.quiet {
        reporter.report_quiet(&view);
    } else {
        reporter.report(&view);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_generate(capture: &TestCapture, output: &str) -> Result<ExitCode> {
    let html = HtmlReporter::new().report(capture)?;
    if output == "-" {
        io::stdout()
            .write_all(html.as_bytes())
            .context("Failed to write report")?;
    } else {
        std::fs::write(output, &html)
            .with_context(|| format!("Failed to write report: {output}"))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_view(args: &Args, report: &Path) -> Result<ExitCode> {
    let store = ReportStore::new();
    store.load(report);

    let Some(view) = store.read(|state| state.test_capture.clone()) else {
        anyhow::bail!("Failed to load report: {}", report.display());
    };

    let reporter = if args.show_output {
        ConsoleReporter::new().with_output()
    } else {
        ConsoleReporter::new()
    };
    if args.quiet {
        reporter.report_quiet(&view);
    } else {
        reporter.report(&view);
    }
    Ok(ExitCode::SUCCESS)
}
