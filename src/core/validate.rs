//! Pre-flight validation
//!
//! Every check must pass before anything on the system is touched. The
//! checks run in a fixed order and fail fast: argument presence, privilege,
//! tooling, port syntax and range, collision with listening sockets,
//! collision with existing SELinux port assignments.

use nix::unistd::Uid;
use tracing::info;

use crate::config::Settings;
use crate::core::error::{Error, Result};
use crate::core::{selinux, service, sockets};

/// Parses and range-checks the port argument (checks a and d).
///
/// # Errors
///
/// Returns [`Error::Usage`] for a missing or non-numeric argument and
/// [`Error::Validation`] for a value outside 1–65535.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_port(arg: Option<&str>) -> Result<u16> {
    let arg = match arg {
        Some(a) if !a.trim().is_empty() => a.trim(),
        _ => {
            return Err(Error::Usage {
                message: "No port supplied".to_string(),
            });
        }
    };

    let value: u32 = arg.parse().map_err(|_| Error::Usage {
        message: format!("'{arg}' is not a port number"),
    })?;

    if !(1..=65_535).contains(&value) {
        return Err(Error::Validation(format!(
            "Port {value} is out of range (must be between 1 and 65535)"
        )));
    }

    Ok(value as u16)
}

/// Runs the full pre-flight sequence and returns the validated port.
///
/// Order matters and mirrors the operator-visible gates: argument present,
/// running as root, policy tooling installed, port in range, port free on
/// the host, port unclaimed in SELinux policy.
///
/// # Errors
///
/// Returns the first failing gate's error; nothing is mutated on any path
/// through this function.
pub async fn preflight(settings: &Settings, port_arg: Option<&str>, euid: Uid) -> Result<u16> {
    if matches!(port_arg, None | Some("")) {
        return Err(Error::Usage {
            message: "No port supplied".to_string(),
        });
    }

    if !euid.is_root() {
        return Err(Error::Privilege);
    }

    if !service::package_installed(settings, &settings.selinux_package).await? {
        return Err(Error::Dependency {
            package: settings.selinux_package.clone(),
        });
    }

    let port = parse_port(port_arg)?;

    let bound = sockets::listening_ports(settings).await?;
    if bound.contains(&port) {
        return Err(Error::Validation(format!(
            "Port {port} is already in use by a listening socket"
        )));
    }

    let bindings = selinux::list_bindings(settings).await?;
    if let Some(owner) = selinux::conflicting_type(&bindings, port) {
        return Err(Error::Validation(format!(
            "Port {port} is already assigned to SELinux type {owner}"
        )));
    }

    info!("Pre-flight checks passed for port {port}");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_argument_is_a_usage_error() {
        assert!(matches!(parse_port(None), Err(Error::Usage { .. })));
        assert!(matches!(parse_port(Some("")), Err(Error::Usage { .. })));
        assert!(matches!(parse_port(Some("   ")), Err(Error::Usage { .. })));
    }

    #[test]
    fn non_numeric_argument_is_a_usage_error() {
        assert!(matches!(parse_port(Some("ssh")), Err(Error::Usage { .. })));
        assert!(matches!(parse_port(Some("22a")), Err(Error::Usage { .. })));
        assert!(matches!(parse_port(Some("-1")), Err(Error::Usage { .. })));
    }

    #[test]
    fn zero_is_out_of_range() {
        assert!(matches!(parse_port(Some("0")), Err(Error::Validation(_))));
    }

    #[test]
    fn boundary_ports_are_accepted() {
        assert_eq!(parse_port(Some("1")).unwrap(), 1);
        assert_eq!(parse_port(Some("65535")).unwrap(), 65535);
    }

    proptest! {
        #[test]
        fn every_port_in_range_is_accepted(port in 1u32..=65_535) {
            prop_assert_eq!(parse_port(Some(&port.to_string())).unwrap(), port as u16);
        }

        #[test]
        fn every_port_above_range_is_rejected(port in 65_536u32..=1_000_000) {
            prop_assert!(matches!(
                parse_port(Some(&port.to_string())),
                Err(Error::Validation(_))
            ));
        }
    }
}
