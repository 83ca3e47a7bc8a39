//! # Namespace Label Reconciler
//!
//! Drives a single namespace to its target Pod Security Standards profile:
//! validate, apply the minimal delta (removals first), validate again. The
//! final validation is authoritative; there are no internal retries.

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::client::{LabelStore, StoreError};
use crate::labels::Validation;
use crate::profile::PolicyTarget;

/// Outcome of a successful reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// False when the namespace was already converged and no mutation was
    /// issued.
    pub changed: bool,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Target namespace does not exist.
    #[error("namespace '{0}' not found")]
    NamespaceNotFound(String),

    /// A cluster call failed mid-reconcile, or the post-mutation check still
    /// reports drift. `residual` carries the drift when one was computed.
    #[error("reconciliation failed for namespace '{namespace}': {message}")]
    ReconciliationFailed {
        namespace: String,
        message: String,
        residual: Option<Validation>,
    },
}

impl ReconcileError {
    fn from_store(namespace: &str, err: StoreError) -> Self {
        match err {
            StoreError::NamespaceNotFound(ns) => Self::NamespaceNotFound(ns),
            other => Self::ReconciliationFailed {
                namespace: namespace.to_string(),
                message: other.to_string(),
                residual: None,
            },
        }
    }
}

/// Reconciler over any [`LabelStore`] implementation.
pub struct NamespaceLabelReconciler<S> {
    store: S,
}

impl<S: LabelStore> NamespaceLabelReconciler<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the reconciler and return the underlying store (used by tests
    /// to inspect recorded mutations).
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Check the namespace against the target without mutating anything.
    #[instrument(skip(self, target), fields(namespace = %namespace, profile = %target.profile))]
    pub async fn validate(
        &self,
        namespace: &str,
        target: &PolicyTarget,
    ) -> Result<Validation, ReconcileError> {
        let current = self
            .store
            .current_labels(namespace)
            .await
            .map_err(|e| ReconcileError::from_store(namespace, e))?;

        let desired = target.desired_labels();
        let validation = Validation::compute(target.profile, &desired, &current);
        debug!("Validation for namespace '{}': {}", namespace, validation);
        Ok(validation)
    }

    /// Converge the namespace onto the target profile.
    ///
    /// Removals are applied before additions as their own cluster call: a
    /// privileged target must be guaranteed free of `enforce*` keys even if
    /// the addition call later fails.
    #[instrument(skip(self, target), fields(namespace = %namespace, profile = %target.profile))]
    pub async fn reconcile(
        &self,
        namespace: &str,
        target: &PolicyTarget,
    ) -> Result<ReconcileResult, ReconcileError> {
        let validation = self.validate(namespace, target).await?;
        if validation.ok() {
            info!(
                "Namespace '{}' already matches profile '{}'",
                namespace, target.profile
            );
            return Ok(ReconcileResult::default());
        }

        let delta = validation.delta();
        debug!(
            "Applying delta to namespace '{}': remove {:?}, add {:?}",
            namespace,
            delta.remove,
            delta.add.keys().collect::<Vec<_>>()
        );

        if !delta.remove.is_empty() {
            self.store
                .remove_labels(namespace, &delta.remove)
                .await
                .map_err(|e| ReconcileError::from_store(namespace, e))?;
        }
        if !delta.add.is_empty() {
            self.store
                .add_labels(namespace, &delta.add)
                .await
                .map_err(|e| ReconcileError::from_store(namespace, e))?;
        }

        let residual = self.validate(namespace, target).await?;
        if !residual.ok() {
            return Err(ReconcileError::ReconciliationFailed {
                namespace: namespace.to_string(),
                message: format!("still out of policy after mutation: {residual}"),
                residual: Some(residual),
            });
        }

        info!(
            "Namespace '{}' reconciled to profile '{}' ({} added, {} removed)",
            namespace,
            target.profile,
            delta.add.len(),
            delta.remove.len()
        );
        Ok(ReconcileResult {
            changed: true,
            added: delta.add.len(),
            removed: delta.remove.len(),
        })
    }
}
