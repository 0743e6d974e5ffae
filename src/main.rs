//! Main entry point for ryt-sig CLI

use anyhow::Context;
use clap::Parser;
use ryt_sig::cli::{Args, OutputFormatter, VerbosityLevel};
use ryt_sig::core::{formats_from_json, FormatResolver};
use ryt_sig::platform::{FileScriptFetcher, HttpScriptFetcher};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbosity_level())?;
    debug!("Starting ryt-sig with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level());

    let mut resolver = FormatResolver::new().with_fetch_options(args.fetch_options());
    if args.local {
        resolver = resolver.with_fetcher(Arc::new(FileScriptFetcher::new()));
    } else {
        resolver = resolver.with_fetcher(Arc::new(HttpScriptFetcher::new()));
    }

    if let Err(e) = run(&args, &resolver, &formatter).await {
        formatter.error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    args: &Args,
    resolver: &FormatResolver,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    if args.extract_only {
        let functions = resolver.get_functions(&args.player).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(functions.as_ref())?);
        } else {
            formatter.print_functions(&functions);
        }
        return Ok(());
    }

    let path = args
        .formats
        .as_ref()
        .context("--formats is required unless --extract-only is given")?;
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let formats = formats_from_json(serde_json::from_str(&text)?)?;
    formatter.info(&format!(
        "Loaded {} format(s) from {}",
        formats.len(),
        path.display()
    ));

    let result = resolver.decipher_formats(formats, &args.player).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.formats)?);
        for failure in &result.failures {
            formatter.warning(&format!(
                "format #{} ({}) failed: {}",
                failure.index,
                failure.format.label(),
                failure.error
            ));
        }
    } else {
        formatter.print_batch(&result);
    }
    Ok(())
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "info",
        VerbosityLevel::Verbose => "debug",
    };

    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
