use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use httex_core::{Client, HttexError, ResponseRecord};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "httex", about = "Execute .http/.rest request files and validate .hresp expectations")]
struct Cli {
    /// Base URL prepended to requests whose URL isn't already absolute.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Named environment profile (`http-client.env.<name>.json`) to load.
    #[arg(long, global = true)]
    env: Option<String>,

    /// Emit machine-readable JSON instead of a human-readable summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send every request in a .http/.rest file and print the results.
    Execute {
        file: PathBuf,
        /// name=value pairs registered as programmatic variables.
        #[arg(short = 'v', long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },
    /// Execute a request file, then validate the responses against a .hresp file.
    Validate {
        request_file: PathBuf,
        expected_file: PathBuf,
        #[arg(short = 'v', long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let run_id = Uuid::new_v4();
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(%run_id, "received interrupt, cancelling in-flight requests");
            cancel_for_signal.cancel();
        }
    });

    match run(cli, run_id, &cancel).await {
        Ok(code) => code,
        Err(e) => {
            error!(%run_id, error = %e, "httex failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, run_id: Uuid, cancel: &CancellationToken) -> Result<ExitCode, HttexError> {
    let mut builder = Client::builder();
    if let Some(base_url) = &cli.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if let Some(env) = &cli.env {
        builder = builder.environment(env.clone());
    }

    match cli.command {
        Command::Execute { file, vars } => {
            for (name, value) in vars {
                builder = builder.set_programmatic_var(name, value);
            }
            let client = builder.build()?;
            info!(%run_id, file = %file.display(), "executing request file");
            let records = client.execute(&file, cancel).await?;
            print_records(&records, cli.json);
            let failed = records.iter().any(|r| r.error.is_some());
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Validate { request_file, expected_file, vars } => {
            for (name, value) in vars {
                builder = builder.set_programmatic_var(name, value);
            }
            let client = builder.build()?;
            info!(%run_id, file = %request_file.display(), "executing request file");
            let records = client.execute(&request_file, cancel).await?;
            print_records(&records, cli.json);

            info!(%run_id, file = %expected_file.display(), "validating responses");
            match client.validate(&expected_file, &records, cancel).await {
                Ok(()) => {
                    println!("validation passed");
                    Ok(ExitCode::SUCCESS)
                }
                Err(HttexError::Validation(errors)) => {
                    for e in errors.iter() {
                        eprintln!("{e}");
                    }
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e),
            }
        }
    }
}

fn print_records(records: &[ResponseRecord], json: bool) {
    if json {
        let summaries: Vec<_> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "request": r.request.name,
                    "status_code": r.status_code,
                    "status_line": r.status_line,
                    "duration_ms": r.duration.as_millis(),
                    "size": r.size,
                    "error": r.error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries).unwrap_or_default());
        return;
    }

    for record in records {
        let name = record.request.name.as_deref().unwrap_or(&record.request.raw_url);
        match &record.error {
            Some(e) => println!("{name}: ERROR {e}"),
            None => println!(
                "{name}: {} ({} ms, {} bytes)",
                record.status_line,
                record.duration.as_millis(),
                record.size
            ),
        }
    }
}
