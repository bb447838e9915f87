//! CLI argument parsing for the publish workflow.
//!
//! The CLI is a thin adapter: it builds a `Config` and `RunOptions`, calls the
//! library, and prints the JSON report. No publishing policy lives here.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "sheetpost",
    version,
    about = "Publish sheet-managed content to blog and social platforms",
    after_help = "Commands:\n  run [PLATFORMS...]   Publish eligible rows (dry-run unless --no-dry-run)\n  rows                 List content ids and statuses from the store\n  platforms            List known platform tags\n\nExamples:\n  sheetpost run naver_blog,tistory --limit 3\n  sheetpost run --platforms threads --no-dry-run\n  sheetpost run naver_blog --content-id C-17 --no-dry-run\n  sheetpost run tistory --rows ./data/posts.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Path to config.json (defaults to $SHEETPOST_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Rows(RowsArgs),
    Platforms,
}

/// Run command inputs.
#[derive(Parser, Debug)]
#[command(about = "Publish eligible content to the selected platforms")]
pub struct RunArgs {
    /// Platforms to publish to, space or comma separated
    #[arg(value_name = "PLATFORM")]
    pub platform_args: Vec<String>,

    /// Platforms to publish to (comma separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Maximum number of publish actions in this run
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Actually publish (the default is a dry run)
    #[arg(long, visible_alias = "prod")]
    pub no_dry_run: bool,

    /// Publish these content ids regardless of status (repeatable)
    #[arg(long = "content-id", value_name = "ID")]
    pub content_ids: Vec<String>,

    /// Read rows from a JSON file instead of fetching from the store
    #[arg(long, value_name = "PATH")]
    pub rows: Option<PathBuf>,
}

/// Rows command inputs.
#[derive(Parser, Debug)]
#[command(about = "List content ids and statuses from the store")]
pub struct RowsArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Positional and `--platforms` selections, split on commas, in order.
    pub fn platform_names(&self) -> Vec<String> {
        self.platform_args
            .iter()
            .chain(self.platforms.iter())
            .flat_map(|arg| arg.split(','))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}
