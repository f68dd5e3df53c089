//! CLI module
//!
//! Command-line interface for querying datasets.
//!
//! # Commands
//!
//! - `url` - Print the resource URL
//! - `count` - Print the effective row count
//! - `fetch` - Download everything in one request
//! - `pages` - Download page by page, writing each page as it arrives

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{RecordSink, Runner};
