//! Ordered, short-circuiting reconciliation of the server role.
//!
//! Reconciliation is organized in three layers:
//!
//! 1. [`RoleReconciler`] reconciles the role-wide PodDisruptionBudget (if the role declares one)
//!    and then every role group, one after the other.
//! 2. [`RoleGroupReconciler`] merges the role group spec with the role spec, computes the labels
//!    of the role group and reconciles its child objects in a fixed order.
//! 3. A [`ResourceReconciler`] builds and applies exactly one child object.
//!
//! Every layer stops at the first step that is not [`ReconcileOutcome::Done`] and hands that
//! outcome (or error) to its caller unchanged. Later steps may depend on earlier ones (the
//! StatefulSet mounts the ConfigMaps and runs as the ServiceAccount), so nothing is ever
//! reconciled ahead of a step that is still pending.
use std::time::Duration;

use async_trait::async_trait;
use kube::runtime::controller::Action;
use snafu::Snafu;
use tracing::debug;

use crate::{client, resources};

mod role;
mod role_group;

pub use role::RoleReconciler;
pub use role_group::RoleGroupReconciler;

/// The delay after which a role group that is not ready yet is looked at again.
pub const DEFAULT_REQUEUE_DELAY: Duration = Duration::from_secs(10);

pub type Result<T = ReconcileOutcome, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to build {kind} {name:?}"))]
    BuildResource {
        source: resources::Error,
        kind: &'static str,
        name: String,
    },

    #[snafu(display("failed to apply {kind} {name:?}"))]
    ApplyResource {
        source: client::Error,
        kind: &'static str,
        name: String,
    },
}

/// The result of a successful reconciliation step.
///
/// Failed steps are reported as [`Error`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The step converged, continue with the next one.
    Done,

    /// The step is not ready yet. Skip all remaining steps and run the whole pass again after
    /// the given delay.
    Requeue(Duration),
}

impl ReconcileOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Translates the outcome of a full pass into the action for the controller runtime.
    pub fn into_action(self) -> Action {
        match self {
            Self::Done => Action::await_change(),
            Self::Requeue(delay) => Action::requeue(delay),
        }
    }
}

/// Reconciles one child object of a role or role group.
//
// We still need the async-trait crate, role groups hold their reconcilers as trait objects.
#[async_trait]
pub trait ResourceReconciler: Send + Sync {
    /// Identifies the reconciled object in logs, e.g. `StatefulSet/simple-zk-server-default`.
    fn name(&self) -> String;

    async fn reconcile(&self) -> Result;
}

/// Runs `reconcilers` one after the other.
///
/// Returns the first error or the first outcome that is not [`ReconcileOutcome::Done`] without
/// invoking any of the following reconcilers. Returns [`ReconcileOutcome::Done`] if every
/// reconciler converged.
pub async fn reconcile_in_order(reconcilers: &[Box<dyn ResourceReconciler + '_>]) -> Result {
    for reconciler in reconcilers {
        let outcome = reconciler.reconcile().await?;
        if !outcome.is_done() {
            debug!(
                resource = %reconciler.name(),
                ?outcome,
                "resource is not ready yet, skipping remaining resources"
            );
            return Ok(outcome);
        }
        debug!(resource = %reconciler.name(), "resource reconciled");
    }
    Ok(ReconcileOutcome::Done)
}
