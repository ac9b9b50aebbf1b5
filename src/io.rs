use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// Create a named temporary file and return its handle.
///
/// The file destructor will be called at the handle drop.
/// **As such, one must not simply get the file path and drop the handle.**
pub fn named_tempfile(suffix: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .into_diagnostic()
        .wrap_err("Could not create a temporary file")
}

/// Move `from` to `to`, falling back to a copy when the rename crosses
/// filesystem boundaries.
pub fn replace_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_err() {
        debug!("Moving the file failed, falling back to copying it");
        std::fs::copy(from, to)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not copy the file to '{}'", to.display()))?;
    }
    Ok(())
}
