//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query and download Socrata open-data datasets
#[derive(Parser, Debug)]
#[command(name = "soda-query")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Query file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub query: Option<PathBuf>,

    /// Data portal host name (e.g. data.cdc.gov)
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Dataset identifier (e.g. abcd-1234)
    #[arg(long, global = true)]
    pub dataset: Option<String>,

    /// Column to select (repeatable)
    #[arg(long = "select", global = true)]
    pub select: Vec<String>,

    /// SoQL filter expression
    #[arg(long = "where", global = true)]
    pub where_clause: Option<String>,

    /// Maximum number of rows
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub limit: Option<i64>,

    /// Number of rows to skip
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    /// Socrata application token
    #[arg(long, global = true)]
    pub app_token: Option<String>,

    /// Send requests to this base URL instead of the domain
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Write records to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Log download progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resource URL
    Url,

    /// Print the number of rows the query returns
    Count,

    /// Download all rows in a single request
    Fetch,

    /// Download rows page by page
    Pages {
        /// Rows per page
        #[arg(long)]
        page_size: Option<u64>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one record per line)
    Json,
    /// Pretty-printed JSON records
    Pretty,
}
