//! Artifact generator - runs the generation template for one table

use std::fs;

use tracing::{debug, warn};

use crate::catalog::{SchemaSource, TableName};
use crate::config::Configuration;
use crate::error::{KlassifyError, Result};

/// Template shipped with the binary: one C# class per table
const BUILTIN_TEMPLATE: &str = include_str!("../../sql/class.sql");

/// Binds the table name so the template can use `@TableName` as a plain variable.
const TABLE_NAME_PRELUDE: &str = "DECLARE @TableName sysname = @P1;\n";

/// A generation batch ready to execute with the table name as `@P1`
#[derive(Debug, Clone)]
pub struct GenerationTemplate {
    batch: String,
}

impl GenerationTemplate {
    /// Wrap a template body that refers to `@TableName`
    pub fn new(body: &str) -> Self {
        if !body.to_ascii_lowercase().contains("@tablename") {
            warn!("Generation template never refers to @TableName");
        }
        Self {
            batch: format!("{}{}", TABLE_NAME_PRELUDE, body),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }

    /// The configured template file, or the builtin one
    pub fn load(config: &Configuration) -> Result<Self> {
        let Some(path) = &config.query_file else {
            return Ok(Self::builtin());
        };

        let body = fs::read_to_string(path).map_err(|e| {
            KlassifyError::ConfigError(format!(
                "Failed to read query file {}: {}",
                path.display(),
                e
            ))
        })?;
        if body.trim().is_empty() {
            return Err(KlassifyError::ConfigError(format!(
                "Query file is empty: {}",
                path.display()
            )));
        }

        debug!("Using generation template {}", path.display());
        Ok(Self::new(&body))
    }

    /// Full SQL text sent to the server
    pub fn batch(&self) -> &str {
        &self.batch
    }
}

/// Generated text for one table, before it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub table: TableName,
    pub content: Option<String>,
}

impl GeneratedArtifact {
    /// Content worth writing. Empty and whitespace-only text counts as nothing.
    pub fn material(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Run `template` for `table` over the shared connection
pub async fn generate<S: SchemaSource + ?Sized>(
    source: &mut S,
    template: &GenerationTemplate,
    table: &TableName,
) -> Result<GeneratedArtifact> {
    let content = source.query_scalar(template.batch(), table).await?;
    Ok(GeneratedArtifact {
        table: table.clone(),
        content,
    })
}
