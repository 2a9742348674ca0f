//! firewalld permanent rule updates via `firewall-cmd`
//!
//! Only invoked when the firewalld unit is active; the pipeline checks that
//! first, so an inactive firewall means zero `firewall-cmd` invocations.
//! All changes target the permanent configuration and are applied to the
//! running rule set with a final `--reload`.

use std::collections::HashSet;

use tracing::info;

use crate::config::Settings;
use crate::core::error::Result;
use crate::core::exec;

/// What the firewall update actually changed. Omissions (old port not
/// listed, `ssh` service absent, new port already allowed) are normal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FirewallChanges {
    pub removed_old_port: bool,
    pub removed_ssh_service: bool,
    pub added_new_port: bool,
}

/// Parses `--list-ports` output: whitespace-separated `port/proto` entries.
fn parse_port_list(output: &str) -> HashSet<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Parses `--list-services` output: whitespace-separated service names.
fn parse_service_list(output: &str) -> HashSet<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Rewrites the permanent rule set for the port change and reloads.
///
/// - drops `<old>/tcp` if it is explicitly allowed;
/// - drops the named `ssh` service rule, which whitelists the default port
///   regardless of the configured one;
/// - allows `<new>/tcp` unless it is already allowed;
/// - reloads so the permanent changes reach the running configuration.
///
/// # Errors
///
/// Returns `Err` if any `firewall-cmd` invocation cannot be executed or
/// exits non-zero.
pub async fn update_rules(
    settings: &Settings,
    old_port: u16,
    new_port: u16,
) -> Result<FirewallChanges> {
    let mut changes = FirewallChanges::default();
    let cmd = &settings.firewall_cmd;

    let ports = parse_port_list(&exec::run_checked(cmd, &["--permanent", "--list-ports"]).await?);

    let old_entry = format!("{old_port}/tcp");
    if ports.contains(&old_entry) {
        let remove = format!("--remove-port={old_entry}");
        exec::run_checked(cmd, &["--permanent", remove.as_str()]).await?;
        info!("Removed {old_entry} from the permanent rules");
        changes.removed_old_port = true;
    }

    let services =
        parse_service_list(&exec::run_checked(cmd, &["--permanent", "--list-services"]).await?);
    if services.contains("ssh") {
        exec::run_checked(cmd, &["--permanent", "--remove-service=ssh"]).await?;
        info!("Removed the ssh service rule");
        changes.removed_ssh_service = true;
    }

    let new_entry = format!("{new_port}/tcp");
    if ports.contains(&new_entry) {
        info!("{new_entry} already allowed, skipping add");
    } else {
        let add = format!("--add-port={new_entry}");
        exec::run_checked(cmd, &["--permanent", add.as_str()]).await?;
        info!("Allowed {new_entry} in the permanent rules");
        changes.added_new_port = true;
    }

    exec::run_checked(cmd, &["--reload"]).await?;
    info!("Firewall reloaded");

    Ok(changes)
}
