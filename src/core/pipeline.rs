//! The ordered mutation pipeline
//!
//! Runs after validation and confirmation, in a fixed order with no path
//! back: backup, config rewrite, SELinux cleanup, SELinux bind, firewall
//! update, service restart. Each step is named and reports `Done`,
//! `Skipped`, or `SoftFailed`; the driver stops at the first hard failure
//! (a returned error) and nothing is ever rolled back automatically — the
//! verified backup is the operator's recovery material.

use std::path::PathBuf;

use serde_json::json;
use tracing::{info, warn};

use crate::audit::{self, EventType};
use crate::config::Settings;
use crate::core::error::Result;
use crate::core::{backup, firewalld, selinux, service, sshd_config};

/// Named pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Backup,
    RewriteConfig,
    SelinuxCleanup,
    SelinuxBind,
    FirewallUpdate,
    RestartService,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Backup => "backup",
            Step::RewriteConfig => "rewrite config",
            Step::SelinuxCleanup => "selinux cleanup",
            Step::SelinuxBind => "selinux bind",
            Step::FirewallUpdate => "firewall update",
            Step::RestartService => "restart service",
        }
    }
}

/// How a single step ended. Hard failures are not represented here — they
/// abort the run as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped(String),
    SoftFailed(String),
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Everything a completed run produced, for display and the audit trail.
#[derive(Debug)]
pub struct ChangeOutcome {
    pub old_port: u16,
    pub new_port: u16,
    pub backup: PathBuf,
    pub steps: Vec<StepReport>,
}

/// Applies the port change. Callers must have run the pre-flight checks
/// and the confirmation gate first; from here on the system is mutated.
///
/// # Errors
///
/// Propagates the first hard failure: backup errors before any mutation,
/// I/O errors from the rewrite, [`crate::core::error::Error::Selinux`]
/// from the bind gate (with restore guidance), external tool failures from
/// the firewall update or the restart.
pub async fn apply_port_change(settings: &Settings, new_port: u16) -> Result<ChangeOutcome> {
    let mut steps = Vec::new();

    let config_text = sshd_config::load(&settings.sshd_config).await?;
    let old_port = sshd_config::current_port(&config_text);

    // Backup: the safety net that makes the destructive steps acceptable.
    let backup_path = match backup::create_backup(settings).await {
        Ok(path) => {
            audit::log_step(
                EventType::Backup,
                true,
                json!({ "path": path.display().to_string() }),
                None,
            )
            .await;
            steps.push(StepReport {
                step: Step::Backup,
                outcome: StepOutcome::Done,
            });
            path
        }
        Err(e) => {
            audit::log_step(EventType::Backup, false, json!({}), Some(e.to_string())).await;
            return Err(e);
        }
    };

    // Rewrite the Port directive. Irreversible without the backup.
    let rewritten = sshd_config::rewrite_port(&config_text, new_port);
    if let Err(e) = sshd_config::persist(&settings.sshd_config, &rewritten) {
        audit::log_step(
            EventType::RewriteConfig,
            false,
            json!({ "old_port": old_port, "new_port": new_port }),
            Some(e.to_string()),
        )
        .await;
        return Err(e);
    }
    audit::log_step(
        EventType::RewriteConfig,
        true,
        json!({ "old_port": old_port, "new_port": new_port }),
        None,
    )
    .await;
    steps.push(StepReport {
        step: Step::RewriteConfig,
        outcome: StepOutcome::Done,
    });

    // Best-effort cleanup of stale labels; never fatal.
    match selinux::cleanup_stale_labels(settings).await {
        Ok(report) => {
            audit::log_step(
                EventType::SelinuxCleanup,
                report.failures.is_empty(),
                json!({ "removed": report.removed, "failures": report.failures }),
                None,
            )
            .await;
            let outcome = if report.failures.is_empty() {
                StepOutcome::Done
            } else {
                StepOutcome::SoftFailed(format!(
                    "{} stale label(s) could not be removed",
                    report.failures.len()
                ))
            };
            steps.push(StepReport {
                step: Step::SelinuxCleanup,
                outcome,
            });
        }
        Err(e) => {
            warn!("Stale label cleanup skipped: {e}");
            audit::log_step(EventType::SelinuxCleanup, false, json!({}), Some(e.to_string()))
                .await;
            steps.push(StepReport {
                step: Step::SelinuxCleanup,
                outcome: StepOutcome::SoftFailed(e.to_string()),
            });
        }
    }

    // Hard gate: the config already names the new port, so a failure here
    // leaves the system inconsistent and must abort with guidance.
    if let Err(e) = selinux::bind_port(settings, new_port, &backup_path).await {
        audit::log_step(
            EventType::SelinuxBind,
            false,
            json!({ "port": new_port }),
            Some(e.to_string()),
        )
        .await;
        return Err(e);
    }
    audit::log_step(EventType::SelinuxBind, true, json!({ "port": new_port }), None).await;
    steps.push(StepReport {
        step: Step::SelinuxBind,
        outcome: StepOutcome::Done,
    });

    // Firewall changes only apply when firewalld is running at all.
    if service::is_active(settings, &settings.firewall_service).await? {
        match firewalld::update_rules(settings, old_port, new_port).await {
            Ok(changes) => {
                audit::log_step(
                    EventType::FirewallUpdate,
                    true,
                    json!({
                        "removed_old_port": changes.removed_old_port,
                        "removed_ssh_service": changes.removed_ssh_service,
                        "added_new_port": changes.added_new_port,
                    }),
                    None,
                )
                .await;
                steps.push(StepReport {
                    step: Step::FirewallUpdate,
                    outcome: StepOutcome::Done,
                });
            }
            Err(e) => {
                audit::log_step(
                    EventType::FirewallUpdate,
                    false,
                    json!({}),
                    Some(e.to_string()),
                )
                .await;
                return Err(e);
            }
        }
    } else {
        info!("{} is not active, skipping firewall update", settings.firewall_service);
        steps.push(StepReport {
            step: Step::FirewallUpdate,
            outcome: StepOutcome::Skipped(format!(
                "{} is not active",
                settings.firewall_service
            )),
        });
    }

    // Final step: make sshd pick up the new port. No health check after
    // this; recovery is manual via the backup.
    if let Err(e) = service::restart(settings, &settings.ssh_service).await {
        audit::log_step(
            EventType::RestartService,
            false,
            json!({ "unit": settings.ssh_service }),
            Some(e.to_string()),
        )
        .await;
        return Err(e);
    }
    audit::log_step(
        EventType::RestartService,
        true,
        json!({ "unit": settings.ssh_service }),
        None,
    )
    .await;
    steps.push(StepReport {
        step: Step::RestartService,
        outcome: StepOutcome::Done,
    });

    Ok(ChangeOutcome {
        old_port,
        new_port,
        backup: backup_path,
        steps,
    })
}
