//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::QueryConfig;
use crate::error::{Result, ResultExt};
use crate::planner::{QueryPlanner, TracingObserver};
use crate::query::{Clause, QueryDefinition};
use crate::types::Record;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.query_config()?;
        let definition = config.to_definition()?;

        match &self.cli.command {
            Commands::Url => {
                println!("{}", definition.resource_url());
                Ok(())
            }
            Commands::Count => {
                let planner = self.planner(definition, &config)?;
                let rows = planner.count_effective_rows().await?;
                println!("{rows}");
                Ok(())
            }
            Commands::Fetch => {
                let planner = self.planner(definition, &config)?;
                let records = planner.fetch_all().await?;

                let mut sink = self.sink()?;
                sink.write_records(&records)?;
                let written = sink.finish()?;
                info!("Wrote {written} records");
                Ok(())
            }
            Commands::Pages { page_size } => {
                let page_size = match page_size {
                    Some(size) => *size,
                    None => config.page_size()?,
                };
                let planner = self.planner(definition, &config)?;
                let mut pages = planner.fetch_pages(page_size)?;

                let mut sink = self.sink()?;
                while let Some(page) = pages.next_page().await? {
                    sink.write_records(&page)?;
                }
                let written = sink.finish()?;
                info!(
                    "Wrote {written} records in {} page(s)",
                    pages.page_count().unwrap_or(0)
                );
                Ok(())
            }
        }
    }

    /// Query file (if any) with command-line overrides applied
    pub fn query_config(&self) -> Result<QueryConfig> {
        let mut config = match &self.cli.query {
            Some(path) => QueryConfig::load(path)?,
            None => QueryConfig::default(),
        };

        if let Some(domain) = &self.cli.domain {
            config.domain = Some(domain.clone());
        }
        if let Some(dataset) = &self.cli.dataset {
            config.dataset = Some(dataset.clone());
        }
        if let Some(token) = &self.cli.app_token {
            config.app_token = Some(token.clone());
        }
        if let Some(base_url) = &self.cli.base_url {
            config.http.base_url = Some(base_url.clone());
        }

        if !self.cli.select.is_empty() {
            config.set_clause(Clause::Select, self.cli.select.clone());
        }
        if let Some(expression) = &self.cli.where_clause {
            config.set_clause(Clause::Where, expression.clone());
        }
        if let Some(limit) = self.cli.limit {
            config.set_clause(Clause::Limit, limit);
        }
        if let Some(offset) = self.cli.offset {
            config.set_clause(Clause::Offset, offset);
        }

        Ok(config)
    }

    fn planner(&self, definition: QueryDefinition, config: &QueryConfig) -> Result<QueryPlanner> {
        let observer = if self.cli.verbose {
            TracingObserver::new()
        } else {
            TracingObserver::warnings_only()
        };
        Ok(QueryPlanner::with_http(definition, config.http_client_config())?.with_observer(observer))
    }

    fn sink(&self) -> Result<RecordSink<Box<dyn Write>>> {
        let writer: Box<dyn Write> = match &self.cli.output {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("Failed to create output file '{}'", path.display())
                })?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout())),
        };
        Ok(RecordSink::new(writer, self.cli.format))
    }
}

/// Writes records as they arrive
pub struct RecordSink<W: Write> {
    writer: W,
    format: OutputFormat,
    written: u64,
}

impl<W: Write> RecordSink<W> {
    /// Create a sink writing to `writer`
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append records
    pub fn write_records(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            match self.format {
                OutputFormat::Json => serde_json::to_writer(&mut self.writer, record)?,
                OutputFormat::Pretty => serde_json::to_writer_pretty(&mut self.writer, record)?,
            }
            self.writer.write_all(b"\n")?;
            self.written += 1;
        }
        Ok(())
    }

    /// Flush and return the number of records written
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.written)
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
