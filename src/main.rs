use std::ffi::OsString;
use std::{env, process};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use cloudland::application::catalog;
use cloudland::cli::output::{self, render_table};
use cloudland::cli::{Cli, CliError, CliResult, Dispatcher, Outcome};
use cloudland::config::Settings;
use cloudland::infrastructure::di::ServiceContainer;

fn main() {
    let argv: Vec<OsString> = env::args_os().collect();

    let cli = match Cli::parse_globals(argv.iter().cloned()) {
        Ok(cli) => cli,
        Err(e) => process::exit(report(&e)),
    };

    match run(&cli, argv) {
        Ok(outcome) => print_outcome(outcome),
        Err(e) => process::exit(report(&e)),
    }
}

fn run(cli: &Cli, argv: Vec<OsString>) -> CliResult<Outcome> {
    let dispatcher = Dispatcher::new(catalog::registry()?);
    dispatcher.dispatch(cli, argv, |call| {
        setup_logging(call.debug);
        let settings = Settings::load(cli.config.as_deref())?;
        tracing::debug!(?settings, "settings loaded");
        Ok(ServiceContainer::new(settings)?)
    })
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Help(text) | Outcome::Version(text) => output::info(text.trim_end()),
        Outcome::Completions(script) => print!("{}", script),
        Outcome::Rows { header, rows } => output::info(&render_table(&header, &rows)),
    }
}

/// Print `e` and return the exit code it maps to.
fn report(e: &CliError) -> i32 {
    match (e, e.rejection()) {
        // the service's message is the command's status line
        (_, Some(message)) => output::info(message),
        // already rendered by clap, including its own prefix
        (CliError::Usage(text), None) => eprintln!("{}", text.trim_end()),
        (CliError::MissingCredentials { .. }, None) => output::warning(e),
        _ => output::error(e),
    }
    e.exit_code()
}

fn setup_logging(verbosity: u8) {
    tracing::debug!("INIT: Attempting logger init from main.rs");

    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    // Connection pool internals drown the request/response log at trace level
    let noisy_modules = ["hyper", "reqwest::connect"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
