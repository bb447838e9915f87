use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use sheetpost::config::load_config;
use sheetpost::normalize::normalize_rows;
use sheetpost::store::store_from_config;
use sheetpost::{run_workflow, Platform, RunOptions};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::{Command, RootArgs, RowsArgs, RunArgs};

const LOG_ENV: &str = "SHEETPOST_LOG";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Run(run) => run_command(args.config.as_deref(), run),
        Command::Rows(rows) => rows_command(args.config.as_deref(), rows),
        Command::Platforms => platforms_command(),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "sheetpost=debug" } else { "sheetpost=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn run_command(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let names = args.platform_names();
    let selected = if names.is_empty() {
        config.platforms.clone()
    } else {
        parse_platforms(&names)?
    };

    let rows = args.rows.as_deref().map(read_rows_file).transpose()?;
    let content_ids = (!args.content_ids.is_empty()).then(|| args.content_ids.clone());
    let limit = args
        .limit
        .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
    let options = RunOptions {
        dry_run: !args.no_dry_run,
        limit,
        content_ids,
        rows,
    };

    let report = run_workflow(&config, &selected, options)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn rows_command(config_path: Option<&Path>, args: RowsArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = store_from_config(config.validate_store()?);
    let raw = store.fetch().context("fetch rows")?;
    let normalized = normalize_rows(&raw);

    if args.json {
        let listing: Vec<Value> = normalized
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "contentId": item.content_id,
                    "platform": item.platform_label,
                    "status": item.status,
                    "attempts": item.attempts,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for item in &normalized.items {
        let status = if item.status.trim().is_empty() {
            "pending"
        } else {
            item.status.trim()
        };
        println!(
            "{}\t{}\t{}\t{}",
            item.content_id, item.platform_label, status, item.attempts
        );
    }
    if !normalized.dropped.is_empty() {
        eprintln!("{} row(s) dropped without a content id", normalized.dropped.len());
    }
    Ok(())
}

fn platforms_command() -> Result<()> {
    let tags: Vec<&str> = Platform::ALL.iter().map(Platform::as_str).collect();
    println!("{}", serde_json::to_string_pretty(&tags)?);
    Ok(())
}

fn parse_platforms(names: &[String]) -> Result<Vec<Platform>> {
    let mut selected = Vec::new();
    for name in names {
        let platform = Platform::parse(name).ok_or_else(|| {
            let known: Vec<&str> = Platform::ALL.iter().map(Platform::as_str).collect();
            anyhow!("unknown platform {name:?} (known: {})", known.join(", "))
        })?;
        if !selected.contains(&platform) {
            selected.push(platform);
        }
    }
    Ok(selected)
}

fn read_rows_file(path: &Path) -> Result<Vec<Value>> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err(anyhow!("{} must contain a JSON array of rows", path.display())),
    }
}
