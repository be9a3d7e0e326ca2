//! Clash profile composer service.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  CLASH COMPOSER                   │
//!                       │                                                   │
//!   GET /config         │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!   ────────────────────┼─▶│  http   │───▶│  source  │───▶│   codec     │◀─┼──── origin / addon
//!                       │  │ server  │    │ resolve  │    │ YAML parse  │  │     (URL or file)
//!                       │  └─────────┘    │ + fetch  │    └──────┬──────┘  │
//!                       │                 └──────────┘           │         │
//!                       │                                        ▼         │
//!                       │                                 ┌─────────────┐  │
//!                       │                                 │   compose   │  │
//!                       │                                 │ groups/rules│  │
//!                       │                                 └──────┬──────┘  │
//!                       │                                        │         │
//!                       │                                        ▼         │
//!   YAML profile        │  ┌─────────┐                    ┌─────────────┐  │
//!   ◀───────────────────┼──│response │◀───────────────────│   script    │  │
//!                       │  └─────────┘                    │  starlark   │  │
//!                       │                                 └─────────────┘  │
//!                       │  ┌────────────────────────────────────────────┐  │
//!                       │  │ config · observability · lifecycle         │  │
//!                       │  └────────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use clash_composer::lifecycle::startup;

#[derive(Parser)]
#[command(name = "clash-composer")]
#[command(about = "Serve Clash profiles merged with an addon profile", long_about = None)]
struct Args {
    /// TOML settings file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = startup::load(args.config.as_deref())?;
    startup::run(config).await
}
