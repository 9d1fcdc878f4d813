//! CLI entry point for klassify

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use klassify::config::{defaults, EnvFileStatus};
use klassify::{Configuration, Overrides};

const AFTER_HELP: &str = "\
Arguments, except `--help`, can be specified in a .env file as KLASSIFY_OUT, KLASSIFY_USER, \
KLASSIFY_PASSWORD, KLASSIFY_SERVER, KLASSIFY_DATABASE, KLASSIFY_TIMEOUT and so on, or as \
environment variables of the same names.
These methods can be combined. Values set on the command line take precedence, then the \
.env file, then the environment.";

#[derive(Parser)]
#[command(name = "klassify")]
#[command(about = "Generate one source file per SQL Server table")]
#[command(version, after_help = AFTER_HELP)]
struct Cli {
    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// SQL Server user id
    #[arg(short, long)]
    user: Option<String>,

    /// SQL Server password
    #[arg(short, long)]
    password: Option<String>,

    /// SQL Server host, as host, host,port or host\instance
    #[arg(short, long)]
    server: Option<String>,

    /// Database whose base tables are generated
    #[arg(short, long)]
    database: Option<String>,

    /// Connection timeout in seconds (0 waits indefinitely)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// T-SQL template run per table, with the table name in @TableName
    #[arg(short, long)]
    query: Option<PathBuf>,

    /// Extension of generated files
    #[arg(short, long)]
    extension: Option<String>,

    /// Tables to include (comma-separated, or "*" for all)
    #[arg(long)]
    include: Option<String>,

    /// Tables to exclude (comma-separated)
    #[arg(long)]
    exclude: Option<String>,

    /// Dry run - show what would be generated without writing files
    #[arg(long)]
    dry_run: bool,

    /// Environment file to read settings from
    #[arg(long, default_value = defaults::ENV_FILE)]
    env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            out: self.out.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            server: self.server.clone(),
            database: self.database.clone(),
            timeout: self.timeout,
            query: self.query.clone(),
            extension: self.extension.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            dry_run: self.dry_run,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (before logging, so we can use config.log_level)
    let (config, env_file) = Configuration::load(&cli.overrides(), &cli.env_file)?;

    // Initialize logging
    // Priority: RUST_LOG env var > config.log_level > default (debug for dev, info for release)
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let log_level = config.log_level.as_deref().unwrap_or(default_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    if let EnvFileStatus::Missing(path) = &env_file {
        info!(
            "No {} file detected. Using specified arguments or defaults.",
            path.display()
        );
    }

    if config.dry_run {
        info!("Dry run mode - no files will be written");
    }

    klassify::generate(&config).await?;
    Ok(())
}
