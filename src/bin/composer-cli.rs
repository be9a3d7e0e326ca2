use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use clash_composer::compose::{Composer, MergeMode};
use clash_composer::config::{FetchConfig, ScriptConfig};
use clash_composer::observability::logging;
use clash_composer::source::{codec, DocumentFetcher, Location};

#[derive(Parser)]
#[command(name = "composer-cli")]
#[command(about = "Compose Clash profiles locally or through a running composer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose two profiles offline and print the result
    Compose {
        /// Baseline profile (path or http(s) URL)
        #[arg(long)]
        origin: String,

        /// Addon profile (path or http(s) URL)
        #[arg(long)]
        addon: Option<String>,

        /// Merge mode: insert, append or update
        #[arg(short, long, default_value = "update")]
        mode: String,

        /// Print the composition report to stderr
        #[arg(long)]
        report: bool,

        /// Only treat groups with an explicit `x-filter` as snippets
        #[arg(long)]
        explicit_only: bool,

        /// Per-snippet budget in milliseconds
        #[arg(long, default_value_t = 2_000)]
        timeout_ms: u64,
    },
    /// Ask a running composer for a profile
    Fetch {
        #[arg(short, long, default_value = "http://localhost:9999")]
        url: String,

        #[arg(long)]
        origin_url: Option<String>,

        #[arg(long)]
        addon_url: Option<String>,

        #[arg(short, long)]
        mode: Option<String>,

        /// Fetch the JSON report instead of the profile
        #[arg(long)]
        report: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_stderr_logging("warn");

    match cli.command {
        Commands::Compose {
            origin,
            addon,
            mode,
            report,
            explicit_only,
            timeout_ms,
        } => {
            let fetcher = DocumentFetcher::new(&FetchConfig::default())?;
            let baseline = codec::parse(&fetcher.fetch(&Location::from_arg(&origin)?).await?)?;
            let addon = match addon {
                Some(addon) => Some(codec::parse(&fetcher.fetch(&Location::from_arg(&addon)?).await?)?),
                None => None,
            };

            let composer = Composer::from_config(&ScriptConfig {
                timeout_ms,
                single_entry_heuristic: !explicit_only,
                ..ScriptConfig::default()
            });
            let mode = MergeMode::parse(&mode);
            let (yaml, outcome) =
                tokio::task::spawn_blocking(move || composer.compose_to_yaml(baseline, addon, mode)).await??;

            print!("{}", String::from_utf8_lossy(&yaml));
            if report {
                eprintln!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            for failure in &outcome.failures {
                eprintln!("warning: {} group '{}' unresolved: {}", failure.origin, failure.group, failure.error);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fetch {
            url,
            origin_url,
            addon_url,
            mode,
            report,
        } => {
            let path = if report { "config/report" } else { "config" };
            let mut query = Vec::new();
            if let Some(origin_url) = origin_url {
                query.push(("origin_url", origin_url));
            }
            if let Some(addon_url) = addon_url {
                query.push(("addon_url", addon_url));
            }
            if let Some(mode) = mode {
                query.push(("mode", mode));
            }

            let res = reqwest::Client::new()
                .get(format!("{}/{}", url.trim_end_matches('/'), path))
                .query(&query)
                .send()
                .await?;
            print_response(res, report).await
        }
    }
}

async fn print_response(res: reqwest::Response, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: composer returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    if let Some(failures) = res.headers().get("x-compose-failures") {
        eprintln!("warning: {} snippet group(s) unresolved", failures.to_str().unwrap_or("?"));
    }
    if json {
        let body: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", res.text().await?);
    }
    Ok(ExitCode::SUCCESS)
}
