//! Configuration backup with integrity verification
//!
//! The backup is the only recovery material for everything that happens
//! after it: the config rewrite is irreversible and nothing auto-rolls
//! back. The copy is therefore verified before any mutation runs — the
//! file must exist and its SHA-256 digest must match the source exactly.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::Settings;
use crate::core::error::{Error, Result};

/// Copies the daemon config into the backup directory and verifies the copy.
///
/// The backup is named `<timestamp>.bak` with second granularity
/// (`%Y%m%d_%H%M%S`), sortable and stable across runs. The directory is
/// created with mode 0700 if absent.
///
/// # Errors
///
/// Returns [`Error::Backup`] if the copy does not land or its digest
/// differs from the source; any such failure aborts the run before the
/// first mutation.
pub async fn create_backup(settings: &Settings) -> Result<PathBuf> {
    ensure_backup_dir(&settings.backup_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let dest = settings.backup_dir.join(format!("{timestamp}.bak"));

    tokio::fs::copy(&settings.sshd_config, &dest).await?;
    verify_backup(&settings.sshd_config, &dest).await?;

    info!("Backup written and verified: {}", dest.display());
    Ok(dest)
}

/// Confirms the backup exists and is byte-identical to the source.
///
/// # Errors
///
/// Returns [`Error::Backup`] when the copy is missing or the digests differ.
pub async fn verify_backup(source: &Path, backup: &Path) -> Result<()> {
    if !tokio::fs::try_exists(backup).await? {
        return Err(Error::Backup(format!(
            "backup file {} was not created",
            backup.display()
        )));
    }

    let source_digest = file_digest(source).await?;
    let backup_digest = file_digest(backup).await?;

    if source_digest != backup_digest {
        return Err(Error::Backup(format!(
            "backup {} does not match the source (expected {source_digest}, got {backup_digest})",
            backup.display()
        )));
    }

    Ok(())
}

/// SHA-256 digest of a file's contents as lowercase hex.
async fn file_digest(path: &Path) -> Result<String> {
    let contents = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(format!("{:x}", hasher.finalize()))
}

fn ensure_backup_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700);
        builder.recursive(true);
        builder.create(dir)
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}
