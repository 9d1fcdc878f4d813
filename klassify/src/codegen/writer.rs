//! Artifact writer - persists generated text as `<table>.<ext>`

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::catalog::TableName;
use crate::config::Configuration;
use crate::error::{KlassifyError, Result};

use super::generator::GeneratedArtifact;

/// UTF-8 byte-order mark written ahead of every file
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What happened to one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written(PathBuf),
    /// Dry run: the file that would have been written
    WouldWrite(PathBuf),
    /// Nothing was generated; no file was created or touched
    Skipped,
}

/// Writes artifacts into one flat output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_directory: PathBuf,
    extension: String,
    dry_run: bool,
}

impl ArtifactWriter {
    pub fn new(output_directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_directory: output_directory.into(),
            extension: extension.into(),
            dry_run: false,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(&config.output_directory, &config.extension).dry_run(config.dry_run)
    }

    /// Report paths without touching the filesystem
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Deterministic output path for `table`
    pub fn path_for(&self, table: &TableName) -> Result<PathBuf> {
        let name = table.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(KlassifyError::write(
                name,
                "table name cannot be used as a file name",
            ));
        }
        Ok(self
            .output_directory
            .join(format!("{}.{}", name, self.extension)))
    }

    /// Replace `<table>.<ext>` with the artifact's content, or skip when it has none.
    pub fn write(&self, artifact: &GeneratedArtifact) -> Result<WriteResult> {
        let Some(content) = artifact.material() else {
            return Ok(WriteResult::Skipped);
        };

        let path = self.path_for(&artifact.table)?;
        if self.dry_run {
            return Ok(WriteResult::WouldWrite(path));
        }

        fs::create_dir_all(&self.output_directory)
            .map_err(|e| KlassifyError::write(artifact.table.as_str(), e))?;
        replace_file(&self.output_directory, &path, content)
            .map_err(|e| KlassifyError::write(artifact.table.as_str(), e))?;

        Ok(WriteResult::Written(path))
    }
}

/// Write into a temporary sibling, then rename it over `path`.
fn replace_file(dir: &Path, path: &Path, content: &str) -> std::io::Result<()> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".klassify-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(dir)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
