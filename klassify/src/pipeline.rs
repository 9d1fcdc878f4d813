//! Pipeline driver - enumerate, generate, write

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::catalog::{MssqlSource, SchemaSource, TableName};
use crate::codegen::{self, ArtifactWriter, GenerationTemplate, WriteResult};
use crate::config::Configuration;
use crate::error::Result;

/// Where a run is. `Failed` is only reached through connection-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Init,
    Connecting,
    Enumerating,
    Generating(TableName),
    Writing(TableName),
    Done,
    Failed,
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    /// Files a dry run would have written
    pub would_write: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives one run over a single connection
pub struct Pipeline<'a> {
    config: &'a Configuration,
    template: &'a GenerationTemplate,
    writer: ArtifactWriter,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Configuration, template: &'a GenerationTemplate) -> Self {
        Self {
            config,
            template,
            writer: ArtifactWriter::from_config(config),
            stage: Stage::Init,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Open the SQL Server connection the run will use
    pub async fn connect(&mut self) -> Result<MssqlSource> {
        self.stage = Stage::Connecting;
        let connected = MssqlSource::connect(self.config).await;
        if connected.is_err() {
            self.stage = Stage::Failed;
        }
        connected
    }

    /// Process every base table. Per-table failures are logged and counted;
    /// a connection-level failure stops the run and is returned.
    pub async fn run<S: SchemaSource + ?Sized>(&mut self, source: &mut S) -> Result<RunSummary> {
        match self.process_all(source).await {
            Ok(summary) => {
                self.stage = Stage::Done;
                Ok(summary)
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    async fn process_all<S: SchemaSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<RunSummary> {
        self.stage = Stage::Enumerating;
        let tables = source.list_base_tables(&self.config.database).await?;
        info!("Found {} base tables in {}", tables.len(), self.config.database);

        let tables = filter_tables(
            tables,
            &self.config.include_tables,
            &self.config.exclude_tables,
        );
        debug!(
            "After filtering: {} tables (include={}, exclude={})",
            tables.len(),
            self.config.include_tables,
            self.config.exclude_tables
        );

        let mut summary = RunSummary::default();
        for table in &tables {
            match self.process_table(source, table).await {
                Ok(WriteResult::Written(path)) => {
                    info!("Created {}", path.display());
                    summary.written += 1;
                }
                Ok(WriteResult::WouldWrite(path)) => {
                    info!("Would create {}", path.display());
                    summary.would_write += 1;
                }
                Ok(WriteResult::Skipped) => {
                    debug!("Nothing generated for {}, skipping", table);
                    summary.skipped += 1;
                }
                Err(e) if !e.is_fatal() => {
                    error!("{}", e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    async fn process_table<S: SchemaSource + ?Sized>(
        &mut self,
        source: &mut S,
        table: &TableName,
    ) -> Result<WriteResult> {
        self.stage = Stage::Generating(table.clone());
        let artifact = codegen::generate(source, self.template, table).await?;

        self.stage = Stage::Writing(table.clone());
        self.writer.write(&artifact)
    }
}

/// Filter tables based on include/exclude lists, keeping catalog order
fn filter_tables(tables: Vec<TableName>, include: &str, exclude: &str) -> Vec<TableName> {
    let include_all = include.trim() == "*" || include.trim().is_empty();
    let include_set: HashSet<&str> = include
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let exclude_set: HashSet<&str> = exclude
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    tables
        .into_iter()
        .filter(|t| {
            let name = t.as_str();
            (include_all || include_set.contains(name)) && !exclude_set.contains(name)
        })
        .collect()
}

/// Connect, run every table, and close the connection on every exit path.
pub async fn execute(config: &Configuration) -> Result<RunSummary> {
    let template = GenerationTemplate::load(config)?;
    let mut pipeline = Pipeline::new(config, &template);

    let mut source = pipeline.connect().await?;
    execute_with(&mut pipeline, &mut source).await
}

/// Run `pipeline` over an open `source`, then close it whether the run
/// finished or failed.
pub async fn execute_with<S: SchemaSource + ?Sized>(
    pipeline: &mut Pipeline<'_>,
    source: &mut S,
) -> Result<RunSummary> {
    let result = pipeline.run(source).await;
    if let Err(e) = source.close().await {
        debug!("Ignoring error while closing connection: {}", e);
    }

    let summary = result?;
    if pipeline.config.dry_run {
        info!(
            "Would generate {} files ({} skipped, {} failed)",
            summary.would_write, summary.skipped, summary.failed
        );
    } else {
        info!(
            "Generated {} files ({} skipped, {} failed)",
            summary.written, summary.skipped, summary.failed
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<TableName> {
        list.iter().copied().map(TableName::from).collect()
    }

    #[test]
    fn test_filter_keeps_catalog_order() {
        let tables = names(&["Orders", "Customers", "Audit"]);
        assert_eq!(
            filter_tables(tables, "*", ""),
            names(&["Orders", "Customers", "Audit"])
        );
    }

    #[test]
    fn test_filter_include_and_exclude() {
        let tables = names(&["Orders", "Customers", "Audit"]);
        assert_eq!(
            filter_tables(tables.clone(), "Audit, Orders", ""),
            names(&["Orders", "Audit"])
        );
        assert_eq!(filter_tables(tables, "", "Audit"), names(&["Orders", "Customers"]));
    }
}
