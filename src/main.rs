//! `config-audit` command line.
//!
//! ```text
//! config-audit diff old.yaml new.yaml      audit records as JSON lines
//! config-audit show --config audit.toml    merged snapshot, masked
//! config-audit run --config audit.toml     long-running audit service
//! config-audit admin status                query a running service
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use config_audit::audit::{emit, redact_snapshot, JsonLinesSink};
use config_audit::config::load_file;
use config_audit::lifecycle::startup;
use config_audit::observability::logging::init_logging;
use config_audit::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(name = "config-audit")]
#[command(version, about = "Audits configuration changes as structured records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two configuration documents and print one audit record per change
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Value of the `source` field
        #[arg(short, long, default_value = "file")]
        source: String,
    },
    /// Print the merged configuration with sensitive values masked
    Show {
        /// Settings file describing the sources
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Extra files layered after the configured ones
        files: Vec<PathBuf>,
    },
    /// Run the audit service until SIGINT/SIGTERM
    Run {
        #[arg(short, long, default_value = "config-audit.toml")]
        config: PathBuf,
    },
    /// Talk to a running service's admin API
    Admin {
        #[arg(short, long, default_value = "http://localhost:8081")]
        url: String,
        #[arg(short, long, env = "CONFIG_AUDIT_API_KEY")]
        key: String,
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Service status
    Status,
    /// Live configuration, masked
    Config,
    /// Reload local sources now
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Diff { old, new, source } => {
            let old = load_file(&old)?;
            let new = load_file(&new)?;
            emit(&source, &old, &new, &JsonLinesSink::stdout());
        }
        Commands::Show { config, files } => {
            let settings = match config {
                Some(path) => load_settings(&path)?,
                None => Settings::default(),
            };
            init_logging(&settings.logging)?;

            let loader = startup::build_loader(&settings.sources)?.with_files(files);
            let snapshot = loader.load().await?;
            println!("{}", serde_json::to_string_pretty(&redact_snapshot(&snapshot))?);
        }
        Commands::Run { config } => {
            let settings = load_settings(&config)?;
            init_logging(&settings.logging)?;
            startup::run(settings).await?;
        }
        Commands::Admin { url, key, command } => {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
            let client = reqwest::Client::builder().default_headers(headers).build()?;

            let res = match command {
                AdminCommands::Status => client.get(format!("{}/admin/status", url)).send().await?,
                AdminCommands::Config => client.get(format!("{}/admin/config", url)).send().await?,
                AdminCommands::Reload => client.post(format!("{}/admin/reload", url)).send().await?,
            };
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
