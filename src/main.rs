use clap::Parser;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use uniovi_classes::parsers::spreadsheet;
use uniovi_classes::{ClassListClient, Settings, StudentId};

const EMPTY_INPUT_MESSAGE: &str = "Debes proporcionar un valor válido para UO";

/// Retrieves a student's class list from the faculty listing and the
/// SharePoint rosters, printing one JSON object on stdout.
#[derive(Debug, Parser)]
#[command(name = "uo-classes", version)]
struct Cli {
    /// Student identifier, with or without the "uo" prefix. Read from stdin when omitted.
    uo: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,

    /// Process an already downloaded roster spreadsheet instead of scraping.
    #[arg(long, value_name = "PATH")]
    sheet: Option<PathBuf>,
}

#[derive(Serialize)]
struct ErrorReport {
    success: bool,
    error: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    if let Some(path) = &cli.sheet {
        let student_id = cli.uo.as_deref().and_then(|raw| StudentId::parse(raw).ok());
        let result = spreadsheet::extract_classes(path, student_id.as_ref());
        return print_json(&result, result.success);
    }

    let raw = match cli.uo.clone() {
        Some(uo) => uo.trim().to_string(),
        None => prompt_for_uo().unwrap_or_default(),
    };
    if raw.is_empty() {
        return print_error(EMPTY_INPUT_MESSAGE.to_string());
    }

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => return print_error(e.to_string()),
    };
    if cli.headed {
        settings.browser.headless = false;
    }

    let client = ClassListClient::new(settings);
    tokio::select! {
        result = client.scrape_all(&raw) => match result {
            Ok(result) => print_json(&result, result.success),
            Err(e) => {
                error!(error = %e, "run aborted");
                print_error(e.to_string())
            }
        },
        _ = tokio::signal::ctrl_c() => print_error("interrupted".to_string()),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn prompt_for_uo() -> io::Result<String> {
    eprintln!("Ingresa el valor del UO:");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_json<T: Serialize>(value: &T, success: bool) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => return print_error(e.to_string()),
    }
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn print_error(message: String) -> ExitCode {
    let report = ErrorReport {
        success: false,
        error: message,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(_) => println!(r#"{{"success": false}}"#),
    }
    ExitCode::FAILURE
}
