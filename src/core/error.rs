use std::path::PathBuf;
use thiserror::Error;

/// Core error types for sshift
///
/// Every pre-flight failure maps to its own variant so the operator sees a
/// distinct message for each gate. [`Error::Cancelled`] is the one variant
/// that exits 0: an explicit "no" at the confirmation prompt is not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// Port argument missing or not a number
    #[error("{message}\nusage: sshift <PORT>")]
    Usage { message: String },

    /// Effective UID is not 0
    #[error("This operation modifies system configuration and must run as root")]
    Privilege,

    /// Required SELinux policy tooling is not installed
    #[error("Required package '{package}' is not installed")]
    Dependency { package: String },

    /// Port out of range, in use, or conflicting with SELinux policy
    #[error("{0}")]
    Validation(String),

    /// Operator answered "n" at the confirmation prompt
    #[error("Cancelled by operator")]
    Cancelled,

    /// Confirmation input was neither yes nor no
    #[error("Unrecognized answer '{0}', aborting without changes")]
    Ambiguous(String),

    /// Backup copy missing or content mismatch; nothing has been mutated yet
    #[error("Backup verification failed: {0}")]
    Backup(String),

    /// SELinux port bind failed after the config file was already rewritten
    #[error(
        "Failed to bind port {port} to {selinux_type}: {stderr}\n\
         The sshd configuration has already been rewritten. Restore it from {} before reconnecting.",
        .backup.display()
    )]
    Selinux {
        port: u16,
        selinux_type: String,
        stderr: String,
        backup: PathBuf,
    },

    /// External tool could not be spawned or exited non-zero
    #[error("{tool} failed: {stderr}")]
    Command {
        tool: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error. Only an explicit cancellation
    /// exits 0; every other failure is 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Cancelled => 0,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_exits_zero() {
        assert_eq!(Error::Cancelled.exit_code(), 0);
    }

    #[test]
    fn failures_exit_one() {
        let errors = [
            Error::Usage {
                message: "No port supplied".into(),
            },
            Error::Privilege,
            Error::Dependency {
                package: "policycoreutils-python-utils".into(),
            },
            Error::Validation("Port 70000 out of range".into()),
            Error::Ambiguous("maybe".into()),
            Error::Backup("digest mismatch".into()),
        ];
        for e in errors {
            assert_eq!(e.exit_code(), 1, "{e}");
        }
    }

    #[test]
    fn selinux_error_names_the_backup() {
        let err = Error::Selinux {
            port: 2222,
            selinux_type: "ssh_port_t".into(),
            stderr: "ValueError: Port already defined".into(),
            backup: PathBuf::from("/root/.sshift/backups/20260101_120000.bak"),
        };
        let text = err.to_string();
        assert!(text.contains("2222"));
        assert!(text.contains("Restore it from"));
        assert!(text.contains("20260101_120000.bak"));
    }

    #[test]
    fn usage_error_carries_syntax_hint() {
        let err = Error::Usage {
            message: "No port supplied".into(),
        };
        assert!(err.to_string().contains("usage: sshift <PORT>"));
    }
}
