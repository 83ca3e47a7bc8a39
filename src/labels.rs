//! # Label-Set Comparison
//!
//! Pure set math over namespace labels: filter to the reserved prefix,
//! compare current against desired, and plan the minimal add/remove delta.
//! Nothing in this module touches the cluster.

use std::collections::BTreeMap;
use std::fmt;

use crate::profile::{SecurityProfile, PSS_PREFIX};

/// Namespace labels keyed by label name.
///
/// `BTreeMap` keeps diff output and log lines in a stable order.
pub type LabelSet = BTreeMap<String, String>;

/// Keep only the labels under the reserved `pod-security.kubernetes.io/`
/// prefix. Everything else on the namespace is left alone.
#[must_use]
pub fn reserved_labels(all: &BTreeMap<String, String>) -> LabelSet {
    all.iter()
        .filter(|(key, _)| key.starts_with(PSS_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// True for the `enforce` and `enforce-version` keys under the reserved
/// prefix. Matches on the full key segment, so an unrelated key that merely
/// starts with the same characters (e.g. `.../enforcer`) does not match.
#[must_use]
pub fn is_enforce_key(key: &str) -> bool {
    key.strip_prefix(PSS_PREFIX)
        .is_some_and(|suffix| suffix == "enforce" || suffix.starts_with("enforce-"))
}

/// Outcome of checking a namespace's current labels against a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Desired pairs absent from the namespace (key missing or wrong value).
    pub missing: LabelSet,
    /// Current reserved-prefix pairs that are not part of the desired set.
    /// Only populated for `restricted`/`baseline`, which require strict
    /// parity.
    pub extra: LabelSet,
    /// `enforce*` keys found while targeting `privileged`. Any entry here is
    /// a hard violation.
    pub forbidden_enforce: Vec<String>,
}

/// Mutation plan derived from a failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Keys to remove, applied before any additions.
    pub remove: Vec<String>,
    /// Pairs to add (or overwrite).
    pub add: LabelSet,
}

impl Validation {
    /// Compare `current` (already filtered to the reserved prefix) against
    /// the profile's desired table.
    ///
    /// `restricted`/`baseline` use strict equality semantics: any current
    /// pair outside the desired table invalidates the check. `privileged`
    /// tolerates extras but flags every `enforce*` key as forbidden.
    #[must_use]
    pub fn compute(profile: SecurityProfile, desired: &LabelSet, current: &LabelSet) -> Self {
        let mut missing = LabelSet::new();
        for (key, value) in desired {
            if current.get(key) != Some(value) {
                missing.insert(key.clone(), value.clone());
            }
        }

        let mut extra = LabelSet::new();
        let mut forbidden_enforce = Vec::new();
        for (key, value) in current {
            match profile {
                SecurityProfile::Privileged => {
                    if is_enforce_key(key) {
                        forbidden_enforce.push(key.clone());
                    }
                }
                SecurityProfile::Restricted | SecurityProfile::Baseline => {
                    if desired.get(key) != Some(value) {
                        extra.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        Self {
            missing,
            extra,
            forbidden_enforce,
        }
    }

    /// True when the namespace already matches the profile exactly.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.forbidden_enforce.is_empty()
    }

    /// Plan the mutations that converge the namespace.
    ///
    /// Removals cover forbidden `enforce*` keys and every extra key (a stale
    /// key with a mismatched value is removed and then re-added with the
    /// desired value). Additions cover every missing pair.
    #[must_use]
    pub fn delta(&self) -> Delta {
        let mut remove: Vec<String> = self.forbidden_enforce.clone();
        remove.extend(self.extra.keys().cloned());
        Delta {
            remove,
            add: self.missing.clone(),
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok() {
            return f.write_str("in policy");
        }
        let missing: Vec<&str> = self.missing.keys().map(String::as_str).collect();
        let extra: Vec<&str> = self.extra.keys().map(String::as_str).collect();
        write!(
            f,
            "missing {missing:?}, extra {extra:?}, forbidden enforce {:?}",
            self.forbidden_enforce
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_reserved_labels_filters_prefix() {
        let all = set(&[
            ("team", "payments"),
            ("pod-security.kubernetes.io/audit", "baseline"),
            ("app.kubernetes.io/name", "api"),
        ]);
        let reserved = reserved_labels(&all);
        assert_eq!(
            reserved,
            set(&[("pod-security.kubernetes.io/audit", "baseline")])
        );
    }

    #[test]
    fn test_is_enforce_key_exact_segments_only() {
        assert!(is_enforce_key("pod-security.kubernetes.io/enforce"));
        assert!(is_enforce_key("pod-security.kubernetes.io/enforce-version"));
        assert!(!is_enforce_key("pod-security.kubernetes.io/enforcer"));
        assert!(!is_enforce_key("pod-security.kubernetes.io/audit"));
        assert!(!is_enforce_key("enforce"));
    }

    #[test]
    fn test_compute_all_labels_missing() {
        let desired = SecurityProfile::Baseline.desired_labels("latest");
        let validation =
            Validation::compute(SecurityProfile::Baseline, &desired, &LabelSet::new());
        assert!(!validation.ok());
        assert_eq!(validation.missing.len(), 6);
        assert!(validation.extra.is_empty());
        assert!(validation.forbidden_enforce.is_empty());
    }

    #[test]
    fn test_compute_converged_namespace() {
        let desired = SecurityProfile::Restricted.desired_labels("latest");
        let validation = Validation::compute(SecurityProfile::Restricted, &desired, &desired);
        assert!(validation.ok());
        assert!(validation.delta().remove.is_empty());
        assert!(validation.delta().add.is_empty());
    }

    #[test]
    fn test_compute_wrong_value_is_both_missing_and_extra() {
        let desired = SecurityProfile::Baseline.desired_labels("latest");
        let mut current = desired.clone();
        current.insert(
            "pod-security.kubernetes.io/audit".to_string(),
            "restricted".to_string(),
        );

        let validation = Validation::compute(SecurityProfile::Baseline, &desired, &current);
        assert!(!validation.ok());
        assert_eq!(
            validation.missing,
            set(&[("pod-security.kubernetes.io/audit", "baseline")])
        );
        assert_eq!(
            validation.extra,
            set(&[("pod-security.kubernetes.io/audit", "restricted")])
        );

        let delta = validation.delta();
        assert_eq!(delta.remove, vec!["pod-security.kubernetes.io/audit"]);
        assert_eq!(delta.add, validation.missing);
    }

    #[test]
    fn test_compute_stray_key_invalidates_strict_profiles() {
        let desired = SecurityProfile::Restricted.desired_labels("latest");
        let mut current = desired.clone();
        current.insert(
            "pod-security.kubernetes.io/bogus".to_string(),
            "x".to_string(),
        );

        let validation = Validation::compute(SecurityProfile::Restricted, &desired, &current);
        assert!(!validation.ok());
        assert!(validation.missing.is_empty());
        assert_eq!(validation.extra, set(&[("pod-security.kubernetes.io/bogus", "x")]));
    }

    #[test]
    fn test_compute_privileged_flags_enforce_keys() {
        let desired = SecurityProfile::Privileged.desired_labels("latest");
        let mut current = desired.clone();
        current.insert(
            "pod-security.kubernetes.io/enforce".to_string(),
            "restricted".to_string(),
        );
        current.insert(
            "pod-security.kubernetes.io/enforce-version".to_string(),
            "latest".to_string(),
        );

        let validation = Validation::compute(SecurityProfile::Privileged, &desired, &current);
        assert!(!validation.ok());
        assert!(validation.missing.is_empty());
        assert_eq!(
            validation.forbidden_enforce,
            vec![
                "pod-security.kubernetes.io/enforce",
                "pod-security.kubernetes.io/enforce-version",
            ]
        );

        // Forbidden keys are removals, ahead of any additions.
        let delta = validation.delta();
        assert_eq!(delta.remove.len(), 2);
        assert!(delta.add.is_empty());
    }

    #[test]
    fn test_compute_privileged_tolerates_non_enforce_extras() {
        let desired = SecurityProfile::Privileged.desired_labels("latest");
        let mut current = desired.clone();
        current.insert(
            "pod-security.kubernetes.io/bogus".to_string(),
            "x".to_string(),
        );

        let validation = Validation::compute(SecurityProfile::Privileged, &desired, &current);
        assert!(validation.ok());
    }
}
