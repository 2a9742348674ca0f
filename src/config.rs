//! Runtime settings: target paths, system names, and external tool commands
//!
//! Every external collaborator (`ss`, `semanage`, `firewall-cmd`,
//! `systemctl`, `rpm`) is reached through a command name stored here, each
//! overridable through an `SSHIFT_*` environment variable. Tests point the
//! overrides at mock scripts so no code path ever needs a real policy
//! database or a running firewalld.

use std::env;
use std::path::PathBuf;

use directories::UserDirs;

use crate::core::error::{Error, Result};

/// Default location of the OpenSSH daemon configuration.
pub const DEFAULT_SSHD_CONFIG: &str = "/etc/ssh/sshd_config";

/// Backup directory relative to the invoking user's home.
pub const BACKUP_SUBDIR: &str = ".sshift/backups";

/// Package that provides `semanage` on Fedora/RHEL derivatives.
pub const SELINUX_TOOLS_PACKAGE: &str = "policycoreutils-python-utils";

/// SELinux type that labels sshd's listening ports.
pub const SSH_PORT_TYPE: &str = "ssh_port_t";

/// Well-known default SSH port. Its SELinux binding is part of base policy
/// and can never be removed.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the daemon config to rewrite.
    pub sshd_config: PathBuf,
    /// Directory that receives timestamped backup copies.
    pub backup_dir: PathBuf,
    /// systemd unit to restart after the change.
    pub ssh_service: String,
    /// systemd unit whose active state gates the firewall step.
    pub firewall_service: String,
    /// SELinux type to relabel.
    pub selinux_type: String,
    /// Package checked by the dependency gate.
    pub selinux_package: String,

    pub ss_cmd: String,
    pub semanage_cmd: String,
    pub firewall_cmd: String,
    pub systemctl_cmd: String,
    pub rpm_cmd: String,
}

impl Settings {
    /// Builds settings from defaults plus `SSHIFT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `Err` if no backup directory override is set and the home
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        let backup_dir = match env::var_os("SSHIFT_BACKUP_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let user_dirs = UserDirs::new().ok_or_else(|| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "Home directory not found; set SSHIFT_BACKUP_DIR",
                    ))
                })?;
                user_dirs.home_dir().join(BACKUP_SUBDIR)
            }
        };

        Ok(Self {
            sshd_config: env::var_os("SSHIFT_SSHD_CONFIG")
                .map_or_else(|| PathBuf::from(DEFAULT_SSHD_CONFIG), PathBuf::from),
            backup_dir,
            ssh_service: "sshd".to_string(),
            firewall_service: "firewalld".to_string(),
            selinux_type: SSH_PORT_TYPE.to_string(),
            selinux_package: SELINUX_TOOLS_PACKAGE.to_string(),
            ss_cmd: command_from_env("SSHIFT_SS_CMD", "ss"),
            semanage_cmd: command_from_env("SSHIFT_SEMANAGE_CMD", "semanage"),
            firewall_cmd: command_from_env("SSHIFT_FIREWALL_CMD", "firewall-cmd"),
            systemctl_cmd: command_from_env("SSHIFT_SYSTEMCTL_CMD", "systemctl"),
            rpm_cmd: command_from_env("SSHIFT_RPM_CMD", "rpm"),
        })
    }
}

fn command_from_env(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
