//! sshift - SSH port reassignment for SELinux/firewalld systems
//!
//! Validates that a target port is usable, takes a verified backup of
//! `sshd_config`, then walks the fixed mutation pipeline: rewrite the
//! `Port` directive, relabel the port in SELinux policy, adjust firewalld
//! when it is running, restart sshd.
//!
//! # Usage
//!
//! ```bash
//! # Interactive (prompts before mutating anything)
//! sshift 2222
//!
//! # Non-interactive, for provisioning scripts
//! sshift 2222 --assume-yes
//! ```
//!
//! Exit codes: 0 on success or an explicit "n" at the prompt; 1 for every
//! validation, backup, or mutation failure.

mod audit;
mod config;
mod core;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::core::error::{Error, Result};
use crate::core::pipeline::{StepOutcome, apply_port_change};
use crate::core::{confirm, sshd_config, validate};

#[derive(Parser)]
#[command(name = "sshift")]
#[command(about = "Reassign the OpenSSH daemon's listening port", long_about = None)]
struct Cli {
    /// New port for the SSH daemon (1-65535)
    port: Option<String>,

    /// Skip the interactive confirmation prompt
    #[arg(short = 'y', long = "assume-yes")]
    assume_yes: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _ = utils::ensure_state_dir();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::Cancelled) => {
            println!("{e}, nothing was changed.");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;

    let port = validate::preflight(&settings, cli.port.as_deref(), nix::unistd::geteuid()).await?;

    let current = sshd_config::current_port(&sshd_config::load(&settings.sshd_config).await?);

    if cli.assume_yes {
        println!("Changing the SSH listening port from {current} to {port} (--assume-yes).");
    } else {
        confirm::confirm_port_change(current, port)?;
    }

    let outcome = apply_port_change(&settings, port).await?;

    println!("✓ sshd is now configured for port {}", outcome.new_port);
    for report in &outcome.steps {
        match &report.outcome {
            StepOutcome::Done => println!("  {:<16} done", report.step.as_str()),
            StepOutcome::Skipped(reason) => {
                println!("  {:<16} skipped ({reason})", report.step.as_str());
            }
            StepOutcome::SoftFailed(reason) => {
                println!("  {:<16} incomplete ({reason})", report.step.as_str());
            }
        }
    }
    println!("Backup of the previous configuration: {}", outcome.backup.display());
    println!("Reconnect with: ssh -p {} <host>", outcome.new_port);

    Ok(())
}
