//! Listening socket enumeration via `ss`
//!
//! The availability gate needs the set of ports currently bound by any
//! listening socket. `ss -tuln` prints one line per socket with the local
//! address in the fifth column; the port is whatever follows the last `:`,
//! which also handles bracketed IPv6 addresses and `*` wildcards.

use std::collections::HashSet;

use tracing::debug;

use crate::config::Settings;
use crate::core::error::Result;
use crate::core::exec;

/// Returns every port with a listening (or bound UDP) socket.
///
/// # Errors
///
/// Returns `Err` if `ss` cannot be executed or exits non-zero.
pub async fn listening_ports(settings: &Settings) -> Result<HashSet<u16>> {
    let output = exec::run_checked(&settings.ss_cmd, &["-tuln"]).await?;
    let ports = parse_listening_ports(&output);
    debug!("{} listening ports found", ports.len());
    Ok(ports)
}

/// Extracts port numbers from `ss -tuln` output.
///
/// Lines without a parseable local-address column (the header, malformed
/// rows) are ignored.
fn parse_listening_ports(output: &str) -> HashSet<u16> {
    output
        .lines()
        .filter_map(|line| {
            let local_addr = line.split_whitespace().nth(4)?;
            let port = local_addr.rsplit(':').next()?;
            port.parse::<u16>().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SS_OUTPUT: &str = "\
Netid State  Recv-Q Send-Q    Local Address:Port   Peer Address:Port Process
udp   UNCONN 0      0           127.0.0.54:53            0.0.0.0:*
udp   UNCONN 0      0        127.0.0.53%lo:53            0.0.0.0:*
tcp   LISTEN 0      128            0.0.0.0:22            0.0.0.0:*
tcp   LISTEN 0      511                  *:80                  *:*
tcp   LISTEN 0      128               [::]:22               [::]:*
tcp   LISTEN 0      100          127.0.0.1:631           0.0.0.0:*
";

    #[test]
    fn parses_ports_from_local_address_column() {
        let ports = parse_listening_ports(SS_OUTPUT);
        assert!(ports.contains(&22));
        assert!(ports.contains(&53));
        assert!(ports.contains(&80));
        assert!(ports.contains(&631));
    }

    #[test]
    fn header_line_is_ignored() {
        let ports = parse_listening_ports(SS_OUTPUT);
        // "Port" from the header parses as nothing; only real ports remain.
        assert_eq!(ports.len(), 4);
    }

    #[test]
    fn ipv6_brackets_and_wildcards_do_not_confuse_the_parser() {
        let ports = parse_listening_ports(
            "tcp LISTEN 0 128 [::1]:2222 [::]:*\ntcp LISTEN 0 128 *:8080 *:*\n",
        );
        assert_eq!(ports, HashSet::from([2222, 8080]));
    }

    #[test]
    fn empty_output_yields_empty_set() {
        assert!(parse_listening_ports("").is_empty());
    }
}
