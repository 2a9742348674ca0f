//! SELinux port labeling via `semanage port`
//!
//! Two concerns live here: the validation scan over the whole policy table
//! (is the target port already assigned to any type?) and the two-phase
//! mutation (best-effort cleanup of stale `ssh_port_t` labels, then the
//! hard-gated bind of the new port).
//!
//! `semanage port -l` prints one row per (type, protocol) with a
//! comma-delimited list of ports and `lo-hi` ranges:
//!
//! ```text
//! SELinux Port Type              Proto    Port Number
//! http_port_t                    tcp      80, 81, 443, 8008, 8443
//! saphostctrl_port_t             tcp      1128-1129
//! ssh_port_t                     tcp      22
//! ```

use std::fmt;

use tracing::{info, warn};

use crate::config::{DEFAULT_SSH_PORT, Settings};
use crate::core::error::{Error, Result};
use crate::core::exec;

/// A single port entry from a policy row: either one port or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortToken {
    Single(u16),
    Range(u16, u16),
}

impl PortToken {
    /// Parses `"22"` or `"1128-1129"`. Returns `None` for anything that is
    /// not a port or an ascending range.
    fn parse(token: &str) -> Option<Self> {
        match token.split_once('-') {
            Some((lo, hi)) => {
                let lo = lo.trim().parse().ok()?;
                let hi = hi.trim().parse().ok()?;
                (lo <= hi).then_some(PortToken::Range(lo, hi))
            }
            None => token.trim().parse().map(PortToken::Single).ok(),
        }
    }

    pub fn contains(self, port: u16) -> bool {
        match self {
            PortToken::Single(p) => p == port,
            PortToken::Range(lo, hi) => (lo..=hi).contains(&port),
        }
    }

    /// Whether this entry participates in the conflict scan.
    ///
    /// Deliberate scope limit: only entries whose port text has fewer than
    /// 5 digits are scanned, so targets >= 10000 are never checked against
    /// existing assignments.
    fn in_scan_scope(self) -> bool {
        match self {
            PortToken::Single(p) => p < 10_000,
            PortToken::Range(lo, hi) => lo < 10_000 && hi < 10_000,
        }
    }
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortToken::Single(p) => write!(f, "{p}"),
            PortToken::Range(lo, hi) => write!(f, "{lo}-{hi}"),
        }
    }
}

/// One row of `semanage port -l`.
#[derive(Debug, Clone)]
pub struct PortBinding {
    pub selinux_type: String,
    pub protocol: String,
    pub tokens: Vec<PortToken>,
}

/// Outcome of the best-effort stale-label cleanup.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    /// (token, stderr) for each removal the policy tool rejected.
    pub failures: Vec<(String, String)>,
}

/// Queries the full policy port table.
///
/// # Errors
///
/// Returns `Err` if `semanage` cannot be executed or exits non-zero.
pub async fn list_bindings(settings: &Settings) -> Result<Vec<PortBinding>> {
    let output = exec::run_checked(&settings.semanage_cmd, &["port", "-l"]).await?;
    Ok(parse_bindings(&output))
}

/// Parses the policy table listing. Header and malformed lines are skipped.
fn parse_bindings(output: &str) -> Vec<PortBinding> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let selinux_type = fields.next()?;
            let protocol = fields.next()?;
            if !matches!(protocol, "tcp" | "udp" | "sctp" | "dccp") {
                return None;
            }
            let tokens = fields
                .filter_map(|t| PortToken::parse(t.trim_end_matches(',')))
                .collect::<Vec<_>>();
            (!tokens.is_empty()).then(|| PortBinding {
                selinux_type: selinux_type.to_string(),
                protocol: protocol.to_string(),
                tokens,
            })
        })
        .collect()
}

/// Returns the SELinux type already holding `port`, if any row in scan scope
/// claims it (any protocol, any type).
pub fn conflicting_type(bindings: &[PortBinding], port: u16) -> Option<&str> {
    bindings
        .iter()
        .find(|b| {
            b.tokens
                .iter()
                .any(|t| t.in_scan_scope() && t.contains(port))
        })
        .map(|b| b.selinux_type.as_str())
}

/// Removes stale tcp labels for the daemon's SELinux type.
///
/// The binding for port 22 is never touched: it ships with base policy and
/// `semanage port -d` refuses to delete it. Any token containing 22 is
/// skipped for the same reason. Individual removal failures are collected,
/// logged, and reported; none of them stop the run.
///
/// # Errors
///
/// Returns `Err` only if the policy table itself cannot be listed; the
/// caller treats that as a soft failure.
pub async fn cleanup_stale_labels(settings: &Settings) -> Result<CleanupReport> {
    let bindings = list_bindings(settings).await?;
    let mut report = CleanupReport::default();

    let stale = bindings
        .iter()
        .filter(|b| b.selinux_type == settings.selinux_type && b.protocol == "tcp")
        .flat_map(|b| b.tokens.iter().copied());

    for token in stale {
        if token.contains(DEFAULT_SSH_PORT) {
            info!("Keeping default binding {token} for {}", settings.selinux_type);
            continue;
        }
        let spec = token.to_string();
        let args = [
            "port",
            "-d",
            "-t",
            settings.selinux_type.as_str(),
            "-p",
            "tcp",
            spec.as_str(),
        ];
        match exec::run_checked(&settings.semanage_cmd, &args).await {
            Ok(_) => {
                info!("Removed stale {} label from port {spec}", settings.selinux_type);
                report.removed.push(spec);
            }
            Err(e) => {
                warn!("Could not remove stale label {spec}: {e}");
                report.failures.push((spec, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Binds the new port to the daemon's SELinux type. Hard gate: by the time
/// this runs the config file has already been rewritten, so a failure aborts
/// the whole operation with restore-from-backup guidance.
///
/// # Errors
///
/// Returns [`Error::Selinux`] carrying the tool stderr and the backup path.
pub async fn bind_port(settings: &Settings, port: u16, backup: &std::path::Path) -> Result<()> {
    let spec = port.to_string();
    let args = [
        "port",
        "-a",
        "-t",
        settings.selinux_type.as_str(),
        "-p",
        "tcp",
        spec.as_str(),
    ];

    match exec::run_checked(&settings.semanage_cmd, &args).await {
        Ok(_) => {
            info!("Bound port {port} to {}", settings.selinux_type);
            Ok(())
        }
        Err(Error::Command { stderr, .. }) => Err(Error::Selinux {
            port,
            selinux_type: settings.selinux_type.clone(),
            stderr,
            backup: backup.to_path_buf(),
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMANAGE_OUTPUT: &str = "\
SELinux Port Type              Proto    Port Number

afs3_callback_port_t           tcp      7001
http_port_t                    tcp      80, 81, 443, 488, 8008, 8009, 8443, 9000
saphostctrl_port_t             tcp      1128-1129
ssh_port_t                     tcp      22, 2345
syslogd_port_t                 udp      514
zope_port_t                    tcp      8021, 9673, 10001
";

    #[test]
    fn parses_rows_and_comma_lists() {
        let bindings = parse_bindings(SEMANAGE_OUTPUT);
        assert_eq!(bindings.len(), 6);

        let http = bindings
            .iter()
            .find(|b| b.selinux_type == "http_port_t")
            .unwrap();
        assert_eq!(http.tokens.len(), 8);
        assert!(http.tokens.contains(&PortToken::Single(8443)));
    }

    #[test]
    fn parses_ranges() {
        let bindings = parse_bindings(SEMANAGE_OUTPUT);
        let sap = bindings
            .iter()
            .find(|b| b.selinux_type == "saphostctrl_port_t")
            .unwrap();
        assert_eq!(sap.tokens, vec![PortToken::Range(1128, 1129)]);
        assert!(sap.tokens[0].contains(1128));
        assert!(sap.tokens[0].contains(1129));
        assert!(!sap.tokens[0].contains(1130));
    }

    #[test]
    fn header_and_blank_lines_are_skipped() {
        let bindings = parse_bindings("SELinux Port Type  Proto  Port Number\n\n");
        assert!(bindings.is_empty());
    }

    #[test]
    fn conflict_scan_finds_assigned_ports() {
        let bindings = parse_bindings(SEMANAGE_OUTPUT);
        assert_eq!(conflicting_type(&bindings, 443), Some("http_port_t"));
        assert_eq!(conflicting_type(&bindings, 514), Some("syslogd_port_t"));
        assert_eq!(conflicting_type(&bindings, 1129), Some("saphostctrl_port_t"));
        assert_eq!(conflicting_type(&bindings, 2222), None);
    }

    #[test]
    fn five_digit_entries_are_out_of_scan_scope() {
        let bindings = parse_bindings(SEMANAGE_OUTPUT);
        // zope_port_t holds 10001, but entries >= 10000 are excluded from
        // the scan by design.
        assert_eq!(conflicting_type(&bindings, 10001), None);
    }

    #[test]
    fn default_port_is_never_scan_noise() {
        let bindings = parse_bindings(SEMANAGE_OUTPUT);
        assert_eq!(conflicting_type(&bindings, 22), Some("ssh_port_t"));
    }

    #[test]
    fn token_display_round_trips_delete_spec() {
        assert_eq!(PortToken::Single(2345).to_string(), "2345");
        assert_eq!(PortToken::Range(1128, 1129).to_string(), "1128-1129");
    }

    #[test]
    fn descending_range_is_rejected() {
        assert_eq!(PortToken::parse("9000-80"), None);
    }

    #[test]
    fn ranges_spanning_the_default_port_count_as_protected() {
        // cleanup skips any token containing 22, including ranges.
        assert!(PortToken::Range(20, 25).contains(DEFAULT_SSH_PORT));
    }

    #[tokio::test]
    async fn cleanup_never_removes_the_default_binding() {
        let mut settings = crate::core::test_helpers::test_settings();
        settings.semanage_cmd = format!(
            "{}/tests/mocks/mock_semanage.sh",
            env!("CARGO_MANIFEST_DIR")
        );

        // The mock table labels 22 and 2345 as ssh_port_t; only the stale
        // label may go.
        let report = cleanup_stale_labels(&settings).await.unwrap();
        assert_eq!(report.removed, vec!["2345".to_string()]);
        assert!(report.failures.is_empty());
    }
}
