//! # Work-List Configuration
//!
//! YAML configuration consumed by the `pss-reconciler` binary: the ordered
//! namespace list with per-entry profiles, plus the batch failure policy.
//!
//! ```yaml
//! failurePolicy: fail-fast
//! namespaces:
//!   - name: team-a
//!     profile: baseline
//!   - name: infra
//!     profile: privileged
//!     version: v1.30
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::batch::{BatchEntry, FailurePolicy};
use crate::profile::{default_version, PolicyTarget, SecurityProfile};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// Namespaces to reconcile, in order.
    pub namespaces: Vec<NamespaceEntry>,

    /// What to do when an entry fails.
    #[serde(default, rename = "failurePolicy")]
    pub failure_policy: FailurePolicy,
}

/// One namespace assignment in the work list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamespaceEntry {
    pub name: String,
    pub profile: SecurityProfile,

    /// Pin for the `-version` companion labels.
    #[serde(default = "default_version")]
    pub version: String,
}

impl ReconcilerConfig {
    /// Load and validate the configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if config.namespaces.is_empty() {
            bail!("config file {} lists no namespaces", path.display());
        }
        Ok(config)
    }

    /// Expand the work list into batch entries.
    #[must_use]
    pub fn entries(&self) -> Vec<BatchEntry> {
        self.namespaces
            .iter()
            .map(|entry| BatchEntry {
                namespace: entry.name.clone(),
                target: PolicyTarget {
                    profile: entry.profile,
                    version: entry.version.clone(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
failurePolicy: collect-all
namespaces:
  - name: team-a
    profile: baseline
  - name: infra
    profile: privileged
    version: v1.30
";
        let config: ReconcilerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::CollectAll);
        assert_eq!(config.namespaces.len(), 2);

        let entries = config.entries();
        assert_eq!(entries[0].namespace, "team-a");
        assert_eq!(entries[0].target.profile, SecurityProfile::Baseline);
        assert_eq!(entries[0].target.version, "latest");
        assert_eq!(entries[1].target.profile, SecurityProfile::Privileged);
        assert_eq!(entries[1].target.version, "v1.30");
    }

    #[test]
    fn test_failure_policy_defaults_to_fail_fast() {
        let yaml = r"
namespaces:
  - name: team-a
    profile: restricted
";
        let config: ReconcilerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let yaml = r"
namespaces:
  - name: team-a
    profile: open
";
        assert!(serde_yaml::from_str::<ReconcilerConfig>(yaml).is_err());
    }
}
