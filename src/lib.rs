#![allow(clippy::missing_errors_doc, clippy::doc_markdown)]

//! Namespace Pod Security Standards label reconciliation
//!
//! This crate keeps the `pod-security.kubernetes.io/*` labels on a set of
//! namespaces converged with their assigned security profile. It is run from
//! the EKS bootstrap pipeline after namespace creation:
//! - `restricted` / `baseline` namespaces carry the full six-label set
//!   (audit/enforce/warn plus their `-version` pins), nothing else
//! - `privileged` namespaces carry audit/warn only; an `enforce` label on a
//!   privileged namespace is a policy violation and is removed
//!
//! The reconciler reads the namespace's live labels, computes the minimal
//! add/remove delta, applies it as batched merge patches, and re-validates.

pub mod batch;
pub mod client;
pub mod config;
pub mod labels;
pub mod profile;
pub mod reconciler;

// Re-export commonly used types
pub use batch::{run_batch, run_validation, BatchEntry, BatchOutcome, BatchReport, FailurePolicy};
pub use client::{KubeLabelStore, LabelStore, StoreError};
pub use config::ReconcilerConfig;
pub use labels::{LabelSet, Validation};
pub use profile::{PolicyTarget, SecurityProfile};
pub use reconciler::{NamespaceLabelReconciler, ReconcileError, ReconcileResult};
