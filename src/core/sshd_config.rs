//! sshd_config port directive parsing and rewriting
//!
//! A directive line is an optionally-commented `Port` keyword followed by a
//! 1–5 digit number and nothing else. The rewrite turns every such line
//! into an active `Port <new>` line, uncommenting as needed, and is
//! idempotent: a second pass with the same port changes nothing. When no
//! line matches at all, the directive is inserted at the top of the file so
//! the rewrite can never silently leave the daemon on the old port.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::DEFAULT_SSH_PORT;
use crate::core::error::Result;

/// A matched `Port` directive line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PortDirective {
    commented: bool,
    value: u32,
}

/// Matches an optionally-commented `Port` directive with a 1–5 digit value.
fn parse_port_directive(line: &str) -> Option<PortDirective> {
    let trimmed = line.trim_start();
    let (commented, rest) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };

    let mut tokens = rest.split_whitespace();
    if tokens.next()? != "Port" {
        return None;
    }
    let value = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    if value.len() > 5 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(PortDirective {
        commented,
        value: value.parse().ok()?,
    })
}

/// Port the daemon is effectively configured to use: the first active
/// `Port` directive, or 22 when every directive is absent or commented.
pub fn current_port(config: &str) -> u16 {
    config
        .lines()
        .filter_map(parse_port_directive)
        .find(|d| !d.commented)
        .map_or(DEFAULT_SSH_PORT, |d| {
            u16::try_from(d.value).unwrap_or(DEFAULT_SSH_PORT)
        })
}

/// Rewrites every matching directive line to `Port <port>`, inserting the
/// directive at the top when nothing matches.
pub fn rewrite_port(config: &str, port: u16) -> String {
    let directive = format!("Port {port}");
    let mut matched = false;

    let mut out = String::with_capacity(config.len() + directive.len() + 1);
    for line in config.lines() {
        if parse_port_directive(line).is_some() {
            matched = true;
            out.push_str(&directive);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    if !matched {
        return format!("{directive}\n{out}");
    }
    out
}

/// Reads the config file.
///
/// # Errors
///
/// Returns `Err` on any read failure.
pub async fn load(path: &Path) -> Result<String> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Writes the rewritten config atomically: temp file in the same directory,
/// flush, carry over the original permissions, rename over the target.
///
/// # Errors
///
/// Returns `Err` if the temp file cannot be written or the rename fails.
pub fn persist(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    // The rename would otherwise leave the config with the temp file's
    // restrictive mode; sshd_config must stay world-readable.
    let original = std::fs::metadata(path)?.permissions();
    std::fs::set_permissions(tmp.path(), original)?;

    tmp.persist(path).map_err(|e| e.error)?;
    info!("Rewrote {}", path.display());
    Ok(())
}
