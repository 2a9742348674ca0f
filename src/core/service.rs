//! Service manager and package queries
//!
//! Thin wrappers around `systemctl` and `rpm`. `is-active` and `rpm -q`
//! answer through their exit status, so a non-zero exit is data, not an
//! error; `restart` is a real mutation and propagates failure.

use tracing::info;

use crate::config::Settings;
use crate::core::error::Result;
use crate::core::exec;

/// Whether a systemd unit is currently active.
///
/// # Errors
///
/// Returns `Err` only if `systemctl` cannot be executed.
pub async fn is_active(settings: &Settings, unit: &str) -> Result<bool> {
    exec::run_succeeds(&settings.systemctl_cmd, &["is-active", "--quiet", unit]).await
}

/// Restarts a systemd unit.
///
/// # Errors
///
/// Returns `Err` if `systemctl restart` fails; there is no health check or
/// rollback beyond this point.
pub async fn restart(settings: &Settings, unit: &str) -> Result<()> {
    info!("Restarting {unit}");
    exec::run_checked(&settings.systemctl_cmd, &["restart", unit]).await?;
    Ok(())
}

/// Whether an RPM package is installed.
///
/// # Errors
///
/// Returns `Err` only if `rpm` cannot be executed.
pub async fn package_installed(settings: &Settings, package: &str) -> Result<bool> {
    exec::run_succeeds(&settings.rpm_cmd, &["-q", package]).await
}
