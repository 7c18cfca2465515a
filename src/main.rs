// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stream_upload::config::{load_and_validate_config, RuntimeBuilder};
use stream_upload::source::FileSource;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("stream-upload: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <config.yaml> <file> [file ...]", args[0]);
        eprintln!("Example: {} configs/local.yaml photos/*.jpg > result.json", args[0]);
        std::process::exit(2);
    }

    let config_file = &args[1];
    let files: Vec<PathBuf> = args[2..].iter().map(PathBuf::from).collect();

    let config = load_and_validate_config(config_file).with_context(|| format!("loading '{}'", config_file))?;
    let runtime = RuntimeBuilder::from_config(&config).context("building pipeline")?;

    let outcome = runtime
        .pipeline()
        .run(FileSource::new(files), tokio::io::stdout())
        .await;
    runtime.shutdown().await;

    match outcome {
        Ok(summary) if summary.records_with_errors > 0 => {
            tracing::warn!(
                "{} of {} item(s) carry errors",
                summary.records_with_errors,
                summary.items
            );
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => bail!(e),
    }
}
