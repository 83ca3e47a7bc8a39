//! # Batch Runner
//!
//! Processes an ordered `(namespace, target)` work list one entry at a time.
//! The default policy stops at the first failure, matching the fail-fast
//! behavior of the surrounding bootstrap pipeline; `CollectAll` records every
//! outcome and lets the caller report all failures at once.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::client::LabelStore;
use crate::labels::Validation;
use crate::profile::PolicyTarget;
use crate::reconciler::{NamespaceLabelReconciler, ReconcileError};

/// What to do when an entry fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the batch at the first failing namespace.
    #[default]
    FailFast,
    /// Process every entry and report all failures.
    CollectAll,
}

/// One unit of work: a namespace and its target policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub namespace: String,
    pub target: PolicyTarget,
}

/// Per-namespace outcome.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Already converged; no mutation issued.
    Unchanged,
    /// Delta applied and convergence confirmed.
    Reconciled { added: usize, removed: usize },
    /// Validate-only mode found drift.
    Drift(Validation),
    Failed(ReconcileError),
}

impl BatchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Reconciled { .. })
    }
}

/// Outcomes for a batch run, in work-list order. Entries skipped by
/// fail-fast do not appear.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, BatchOutcome)>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &(String, BatchOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
    }

    fn push(&mut self, namespace: &str, outcome: BatchOutcome) {
        self.outcomes.push((namespace.to_string(), outcome));
    }

    fn log_summary(&self, total_entries: usize) {
        let changed = self
            .outcomes
            .iter()
            .filter(|(_, o)| matches!(o, BatchOutcome::Reconciled { .. }))
            .count();
        let unchanged = self
            .outcomes
            .iter()
            .filter(|(_, o)| matches!(o, BatchOutcome::Unchanged))
            .count();
        let failed = self.failures().count();
        let skipped = total_entries - self.outcomes.len();

        if failed == 0 {
            info!(
                "Batch complete: {} reconciled, {} already in policy",
                changed, unchanged
            );
        } else {
            error!(
                "Batch finished with failures: {} reconciled, {} already in policy, {} failed, {} skipped",
                changed, unchanged, failed, skipped
            );
        }
    }
}

/// Reconcile every entry in order.
pub async fn run_batch<S: LabelStore>(
    reconciler: &NamespaceLabelReconciler<S>,
    entries: &[BatchEntry],
    policy: FailurePolicy,
) -> BatchReport {
    let mut report = BatchReport::default();

    for entry in entries {
        match reconciler.reconcile(&entry.namespace, &entry.target).await {
            Ok(result) if result.changed => {
                report.push(
                    &entry.namespace,
                    BatchOutcome::Reconciled {
                        added: result.added,
                        removed: result.removed,
                    },
                );
            }
            Ok(_) => report.push(&entry.namespace, BatchOutcome::Unchanged),
            Err(err) => {
                error!(
                    "Reconciliation failed for namespace '{}': {}",
                    entry.namespace, err
                );
                report.push(&entry.namespace, BatchOutcome::Failed(err));
                if policy == FailurePolicy::FailFast {
                    break;
                }
            }
        }
    }

    report.log_summary(entries.len());
    report
}

/// Check every entry in order without mutating anything.
pub async fn run_validation<S: LabelStore>(
    reconciler: &NamespaceLabelReconciler<S>,
    entries: &[BatchEntry],
    policy: FailurePolicy,
) -> BatchReport {
    let mut report = BatchReport::default();

    for entry in entries {
        match reconciler.validate(&entry.namespace, &entry.target).await {
            Ok(validation) if validation.ok() => {
                info!(
                    "Namespace '{}' matches profile '{}'",
                    entry.namespace, entry.target.profile
                );
                report.push(&entry.namespace, BatchOutcome::Unchanged);
            }
            Ok(validation) => {
                warn!(
                    "Namespace '{}' drifts from profile '{}': {}",
                    entry.namespace, entry.target.profile, validation
                );
                report.push(&entry.namespace, BatchOutcome::Drift(validation));
                if policy == FailurePolicy::FailFast {
                    break;
                }
            }
            Err(err) => {
                error!(
                    "Validation failed for namespace '{}': {}",
                    entry.namespace, err
                );
                report.push(&entry.namespace, BatchOutcome::Failed(err));
                if policy == FailurePolicy::FailFast {
                    break;
                }
            }
        }
    }

    report.log_summary(entries.len());
    report
}
