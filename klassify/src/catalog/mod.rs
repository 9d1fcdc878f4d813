//! Catalog access: base-table enumeration and generation queries

mod mssql;

pub use mssql::{MssqlSource, ServerAddress};

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Name of one base table, exactly as the catalog reports it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TableName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A single open connection to the database being generated from.
///
/// Implementations classify their failures: anything that means the connection
/// itself is unusable is a `ConnectionError`, while a failure confined to one
/// statement is a `GenerationError` naming the table.
#[async_trait]
pub trait SchemaSource: Send {
    /// Base tables (no views) of `database`, in the order the catalog returns them.
    async fn list_base_tables(&mut self, database: &str) -> Result<Vec<TableName>>;

    /// Execute `batch` with `table` bound as `@P1` and return the first column of
    /// the first row, or `None` when there is no row or the value is NULL.
    async fn query_scalar(&mut self, batch: &str, table: &TableName) -> Result<Option<String>>;

    /// Release the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}
