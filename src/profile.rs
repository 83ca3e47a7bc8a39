//! # Security Profile Definitions
//!
//! Each namespace in the bootstrap work list is pinned to one of the three
//! upstream Pod Security Standards profiles. A profile expands to a fixed
//! table of `pod-security.kubernetes.io/*` labels; that table is the single
//! source of truth the reconciler converges namespaces toward.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::labels::LabelSet;

/// Reserved prefix shared by all Pod Security Standards namespace labels.
pub const PSS_PREFIX: &str = "pod-security.kubernetes.io/";

/// Default pin for the `-version` companion labels.
pub const DEFAULT_VERSION: &str = "latest";

/// Pod Security Standards profile assigned to a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityProfile {
    /// Heavily restricted, current pod-hardening best practices
    Restricted,
    /// Minimally restrictive, blocks known privilege escalations
    Baseline,
    /// Unrestricted; enforcement labels must never be present
    Privileged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid security profile '{0}' (expected restricted, baseline, or privileged)")]
pub struct InvalidProfile(pub String);

impl SecurityProfile {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::Baseline => "baseline",
            Self::Privileged => "privileged",
        }
    }

    /// Admission modes this profile labels a namespace with.
    ///
    /// `privileged` omits `enforce`: a privileged namespace must never carry
    /// an enforcement label, not even `enforce=privileged`.
    fn modes(self) -> &'static [&'static str] {
        match self {
            Self::Restricted | Self::Baseline => &["audit", "enforce", "warn"],
            Self::Privileged => &["audit", "warn"],
        }
    }

    /// Expand the profile into its canonical label table.
    ///
    /// Six entries for `restricted`/`baseline`, four for `privileged`. Mode
    /// labels carry the profile name, `-version` labels carry `version`.
    #[must_use]
    pub fn desired_labels(self, version: &str) -> LabelSet {
        let mut labels = LabelSet::new();
        for mode in self.modes() {
            labels.insert(format!("{PSS_PREFIX}{mode}"), self.as_str().to_string());
            labels.insert(format!("{PSS_PREFIX}{mode}-version"), version.to_string());
        }
        labels
    }
}

impl FromStr for SecurityProfile {
    type Err = InvalidProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restricted" => Ok(Self::Restricted),
            "baseline" => Ok(Self::Baseline),
            "privileged" => Ok(Self::Privileged),
            other => Err(InvalidProfile(other.to_string())),
        }
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A namespace's target policy: profile plus the version pin applied to the
/// `-version` companion labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTarget {
    pub profile: SecurityProfile,
    #[serde(default = "default_version")]
    pub version: String,
}

pub(crate) fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl PolicyTarget {
    #[must_use]
    pub fn new(profile: SecurityProfile) -> Self {
        Self {
            profile,
            version: default_version(),
        }
    }

    #[must_use]
    pub fn desired_labels(&self) -> LabelSet {
        self.profile.desired_labels(&self.version)
    }
}

impl From<SecurityProfile> for PolicyTarget {
    fn from(profile: SecurityProfile) -> Self {
        Self::new(profile)
    }
}
