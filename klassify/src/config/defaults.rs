//! Default configuration values - single source of truth

/// Prefix shared by every environment variable and `.env` key
pub const ENV_PREFIX: &str = "KLASSIFY";

/// Environment file looked up in the working directory
pub const ENV_FILE: &str = ".env";

/// Default output directory
pub const OUT: &str = ".";

/// Default SQL Server host
pub const SERVER: &str = "localhost";

/// Default SQL Server TCP port when `server` does not name one
pub const PORT: u16 = 1433;

/// Default connection timeout in seconds (0 waits indefinitely)
pub const TIMEOUT: u64 = 30;

/// Default extension of generated files
pub const EXTENSION: &str = "cs";

/// Default include tables pattern (all tables)
pub const INCLUDE_TABLES: &str = "*";

/// Default exclude tables pattern (none)
pub const EXCLUDE_TABLES: &str = "";

/// Whether to run in dry-run mode by default
pub const DRY_RUN: bool = false;
