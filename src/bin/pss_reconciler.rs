//! Namespace PSS label reconciler CLI
//!
//! Run from the bootstrap pipeline after namespace creation:
//! - `pss-reconciler reconcile --config namespaces.yaml` applies the label
//!   deltas and exits non-zero if any namespace fails to converge
//! - `pss-reconciler validate --config namespaces.yaml` is the read-only
//!   drift check

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pss_reconciler::{
    run_batch, run_validation, BatchEntry, BatchReport, FailurePolicy, KubeLabelStore,
    NamespaceLabelReconciler, PolicyTarget, ReconcilerConfig, SecurityProfile,
};

#[derive(Parser)]
#[command(
    name = "pss-reconciler",
    version,
    about = "Reconcile namespace Pod Security Standards labels",
    long_about = "Converge the pod-security.kubernetes.io/* labels on a list of namespaces\n\
                  with their assigned security profile (restricted, baseline, privileged)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply label deltas so namespaces match their target profile
    Reconcile(TargetArgs),

    /// Check namespaces against their target profile without mutating
    Validate(TargetArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Work-list YAML file (namespaces with name/profile entries)
    #[arg(long, conflicts_with_all = ["namespace", "profile"])]
    config: Option<PathBuf>,

    /// Single namespace to target (instead of --config)
    #[arg(long, requires = "profile", required_unless_present = "config")]
    namespace: Option<String>,

    /// Security profile for --namespace
    #[arg(long, requires = "namespace")]
    profile: Option<SecurityProfile>,

    /// Keep processing remaining namespaces after a failure
    #[arg(long)]
    keep_going: bool,
}

impl TargetArgs {
    fn work_list(&self) -> Result<(Vec<BatchEntry>, FailurePolicy)> {
        let (entries, mut policy) = if let Some(path) = &self.config {
            let config = ReconcilerConfig::from_file(path)?;
            (config.entries(), config.failure_policy)
        } else {
            // clap guarantees namespace and profile are both present here
            let namespace = self.namespace.clone().context("--namespace is required")?;
            let profile = self.profile.context("--profile is required")?;
            let entries = vec![BatchEntry {
                namespace,
                target: PolicyTarget::new(profile),
            }];
            (entries, FailurePolicy::default())
        };

        if self.keep_going {
            policy = FailurePolicy::CollectAll;
        }
        Ok((entries, policy))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pss-reconciler v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let client = kube::Client::try_default()
        .await
        .context("failed to build Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let reconciler = NamespaceLabelReconciler::new(KubeLabelStore::new(client));

    let report = match &cli.command {
        Commands::Reconcile(args) => {
            let (entries, policy) = args.work_list()?;
            info!("Reconciling {} namespace(s)", entries.len());
            run_batch(&reconciler, &entries, policy).await
        }
        Commands::Validate(args) => {
            let (entries, policy) = args.work_list()?;
            info!("Validating {} namespace(s)", entries.len());
            run_validation(&reconciler, &entries, policy).await
        }
    };

    exit_with(&report)
}

fn exit_with(report: &BatchReport) -> Result<()> {
    if report.succeeded() {
        return Ok(());
    }
    for (namespace, outcome) in report.failures() {
        error!("Namespace '{}' did not converge: {:?}", namespace, outcome);
    }
    std::process::exit(1);
}
