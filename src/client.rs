//! # Namespace Label Store
//!
//! Cluster access for the reconciler: read a namespace's labels and apply
//! batched add/remove mutations. The surface is a trait so tests can swap in
//! an in-memory store and count mutation calls.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::labels::{reserved_labels, LabelSet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("namespace '{0}' not found")]
    NamespaceNotFound(String),

    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

/// Read/mutate surface the reconciler needs from the cluster.
#[async_trait]
pub trait LabelStore {
    /// Labels currently on the namespace, filtered to the reserved
    /// `pod-security.kubernetes.io/` prefix.
    async fn current_labels(&self, namespace: &str) -> Result<LabelSet, StoreError>;

    /// Add (or overwrite) the given labels in one batched call.
    async fn add_labels(&self, namespace: &str, labels: &LabelSet) -> Result<(), StoreError>;

    /// Remove the given label keys in one batched call, regardless of their
    /// current values.
    async fn remove_labels(&self, namespace: &str, keys: &[String]) -> Result<(), StoreError>;
}

/// `LabelStore` backed by the cluster API.
#[derive(Clone)]
pub struct KubeLabelStore {
    namespaces: Api<Namespace>,
}

impl KubeLabelStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            namespaces: Api::all(client),
        }
    }

    fn classify(namespace: &str, err: kube::Error) -> StoreError {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => {
                StoreError::NamespaceNotFound(namespace.to_string())
            }
            other => StoreError::Api(other),
        }
    }
}

/// Merge-patch body that sets the given labels.
fn add_patch(labels: &LabelSet) -> Value {
    json!({
        "metadata": {
            "labels": labels
        }
    })
}

/// Merge-patch body that clears the given label keys. A JSON merge patch
/// deletes a field when its value is `null`.
fn remove_patch(keys: &[String]) -> Value {
    let mut labels = Map::new();
    for key in keys {
        labels.insert(key.clone(), Value::Null);
    }
    json!({
        "metadata": {
            "labels": labels
        }
    })
}

#[async_trait]
impl LabelStore for KubeLabelStore {
    async fn current_labels(&self, namespace: &str) -> Result<LabelSet, StoreError> {
        let ns = self
            .namespaces
            .get(namespace)
            .await
            .map_err(|e| Self::classify(namespace, e))?;

        let labels = ns
            .metadata
            .labels
            .as_ref()
            .map(reserved_labels)
            .unwrap_or_default();

        debug!(
            "Namespace '{}' carries {} pod-security labels",
            namespace,
            labels.len()
        );
        Ok(labels)
    }

    async fn add_labels(&self, namespace: &str, labels: &LabelSet) -> Result<(), StoreError> {
        if labels.is_empty() {
            return Ok(());
        }

        let patch_params = PatchParams::default();
        self.namespaces
            .patch(namespace, &patch_params, &Patch::Merge(add_patch(labels)))
            .await
            .map_err(|e| Self::classify(namespace, e))?;

        debug!("Added {} labels to namespace '{}'", labels.len(), namespace);
        Ok(())
    }

    async fn remove_labels(&self, namespace: &str, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let patch_params = PatchParams::default();
        self.namespaces
            .patch(namespace, &patch_params, &Patch::Merge(remove_patch(keys)))
            .await
            .map_err(|e| Self::classify(namespace, e))?;

        debug!(
            "Removed {} labels from namespace '{}'",
            keys.len(),
            namespace
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_patch_shape() {
        let mut labels = LabelSet::new();
        labels.insert(
            "pod-security.kubernetes.io/audit".to_string(),
            "baseline".to_string(),
        );

        assert_eq!(
            add_patch(&labels),
            json!({
                "metadata": {
                    "labels": {
                        "pod-security.kubernetes.io/audit": "baseline"
                    }
                }
            })
        );
    }

    #[test]
    fn test_remove_patch_uses_nulls() {
        let keys = vec![
            "pod-security.kubernetes.io/enforce".to_string(),
            "pod-security.kubernetes.io/enforce-version".to_string(),
        ];

        assert_eq!(
            remove_patch(&keys),
            json!({
                "metadata": {
                    "labels": {
                        "pod-security.kubernetes.io/enforce": null,
                        "pod-security.kubernetes.io/enforce-version": null
                    }
                }
            })
        );
    }
}
