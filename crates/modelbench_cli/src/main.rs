//! Command-line surface for modelbench.
//!
//! # Responsibility
//! - Open the source locators given on the command line through a headless
//!   coordinator.
//! - Apply `-name value` parameter overrides to the opened documents.
//! - Drive the run/statistics flags and map outcomes to exit codes.
//!
//! # Invariants
//! - A trailing `-name` with no following value is a usage error with a
//!   non-zero exit code.
//! - Successful invocations exit 0; with `-runThenExit`/`-run20x` the exit
//!   happens after all executions finish.

use log::info;
use modelbench_core::{
    default_log_level, init_logging, Coordinator, CoordinatorConfig, LogSettings,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

const RUN_20X_ITERATIONS: usize = 20;

/// Parsed command-line options.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    locators: Vec<String>,
    parameters: Vec<(String, String)>,
    run: bool,
    run_20x: bool,
    statistics: bool,
    show_help: bool,
    show_version: bool,
}

/// Command-line usage errors.
#[derive(Debug, PartialEq, Eq)]
enum CliError {
    /// `-name` appeared as the last argument, with no value to pair it with.
    MissingParameterValue(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParameterValue(name) => {
                write!(f, "cannot set parameter `{name}` when no value is given")
            }
        }
    }
}

impl Error for CliError {}

fn parse_args(args: &[String]) -> Result<CliOptions, CliError> {
    let mut options = CliOptions::default();
    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_str();
        match arg {
            "-help" => options.show_help = true,
            "-version" => options.show_version = true,
            "-run" => options.run = true,
            "-runThenExit" => options.run = true,
            "-run20x" => {
                options.run = true;
                options.run_20x = true;
            }
            "-statistics" => options.statistics = true,
            "" => {}
            _ if arg.starts_with('-') => {
                // Any other -name is a parameter override and needs a value.
                if index + 1 >= args.len() {
                    return Err(CliError::MissingParameterValue(arg.to_string()));
                }
                options
                    .parameters
                    .push((arg[1..].to_string(), args[index + 1].clone()));
                index += 1;
            }
            _ => options.locators.push(arg.to_string()),
        }
        index += 1;
    }
    Ok(options)
}

fn usage() -> String {
    [
        "Usage: modelbench [locator ...] [-parameterName value ...] [flags]",
        "",
        "Flags:",
        "  -help          print this usage text and exit",
        "  -version       print the version and exit",
        "  -run           execute the opened documents once",
        "  -runThenExit   execute the opened documents, then exit",
        "  -run20x        execute the opened documents twenty times, then exit",
        "  -statistics    print per-document statistics as JSON",
        "",
        "Any other -name value pair is applied as a parameter override to",
        "every opened document that recognizes the name.",
    ]
    .join("\n")
}

fn bootstrap_logging() {
    let directory = std::env::temp_dir().join("modelbench-logs");
    let settings = match LogSettings::new(default_log_level(), &directory) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("warning: logging disabled: {err}");
            return;
        }
    };
    if let Err(err) = init_logging(&settings) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn run(options: &CliOptions) -> ExitCode {
    let mut coordinator = Coordinator::new(CoordinatorConfig::headless());
    if let Err(err) = coordinator.install_default_factories() {
        eprintln!("error: {err}");
        return ExitCode::from(1);
    }

    for locator in &options.locators {
        if let Err(err) = coordinator.open(locator) {
            eprintln!("error: failed to open `{locator}`: {err}");
            return ExitCode::from(1);
        }
        info!("event=cli_open module=cli status=ok locator={locator}");
    }

    for (name, value) in &options.parameters {
        if coordinator.apply_parameter(name, value) == 0 {
            eprintln!("warning: no open document recognizes parameter `{name}`");
        }
    }

    if options.run {
        let iterations = if options.run_20x {
            RUN_20X_ITERATIONS
        } else {
            1
        };
        for iteration in 0..iterations {
            let executed = coordinator.execute_open_documents();
            info!(
                "event=cli_run module=cli status=ok iteration={} executed={executed}",
                iteration + 1
            );
        }
    }

    if options.statistics {
        match serde_json::to_string_pretty(&coordinator.statistics()) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("error: failed to render statistics: {err}");
                return ExitCode::from(1);
            }
        }
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("{}", usage());
            return ExitCode::from(1);
        }
    };

    if options.show_help {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }
    if options.show_version {
        println!("modelbench {}", modelbench_core::core_version());
        return ExitCode::SUCCESS;
    }

    bootstrap_logging();
    run(&options)
}
