//! klassify: generate one source file per SQL Server table
//!
//! klassify lists the base tables of a catalog and runs a generation query for
//! each of them, with the table name bound as `@TableName`. Whatever text the
//! query returns is written to `<out>/<table>.<ext>`; tables for which the query
//! returns nothing are skipped.
//!
//! The builtin query renders a C# class per table. Any T-SQL batch that
//! returns a single text value can replace it:
//!
//! ```sql
//! SELECT N'export interface ' + @TableName + N' {}';
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! klassify --server db.internal,1433 --database Sales --out ./gen
//! ```
//!
//! Every flag except `--help` can also come from a `.env` file or from
//! `KLASSIFY_*` environment variables; the command line wins, then the `.env`
//! file, then the environment.
//!
//! # Library Usage
//!
//! ```rust,ignore
//! use klassify::{Configuration, Overrides};
//!
//! let overrides = Overrides {
//!     database: Some("Sales".into()),
//!     ..Default::default()
//! };
//! let (config, _) = Configuration::load(&overrides, ".env".as_ref())?;
//! let summary = klassify::generate(&config).await?;
//! println!("{} files written", summary.written);
//! ```

pub mod catalog;
pub mod codegen;
pub mod config;
pub mod error;
pub mod pipeline;

pub use catalog::{SchemaSource, TableName};
pub use crate::config::{Configuration, Overrides};
pub use error::{KlassifyError, Result};
pub use pipeline::{Pipeline, RunSummary};

/// Main entry point: connect, generate every table, close.
pub async fn generate(config: &Configuration) -> Result<RunSummary> {
    pipeline::execute(config).await
}
