//! Shared test utilities for core module tests
//!
//! Only compiled in test mode. Integration tests under `tests/` carry
//! their own copies since this module is not visible to external test
//! crates.

use std::path::PathBuf;

use crate::config::Settings;

/// Settings that never touch the real system: config and backup paths point
/// nowhere and every external tool resolves to `true`, so an accidental
/// invocation is a harmless no-op instead of a policy mutation.
pub fn test_settings() -> Settings {
    Settings {
        sshd_config: PathBuf::from("/nonexistent/sshd_config"),
        backup_dir: PathBuf::from("/nonexistent/backups"),
        ssh_service: "sshd".to_string(),
        firewall_service: "firewalld".to_string(),
        selinux_type: "ssh_port_t".to_string(),
        selinux_package: "policycoreutils-python-utils".to_string(),
        ss_cmd: "true".to_string(),
        semanage_cmd: "true".to_string(),
        firewall_cmd: "true".to_string(),
        systemctl_cmd: "true".to_string(),
        rpm_cmd: "true".to_string(),
    }
}
