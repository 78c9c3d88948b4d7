//! Ensures that the server role of a `ZookeeperCluster` converges towards its spec.
use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use k8s_openapi::api::{
    apps::v1::StatefulSet,
    core::v1::{ConfigMap, Service, ServiceAccount},
    policy::v1::PodDisruptionBudget,
};
use kube::{
    Api, ResourceExt,
    runtime::{Controller, controller::Action, watcher},
};
use snafu::{ResultExt, Snafu};
use strum::{EnumDiscriminants, IntoStaticStr};
use tracing::{info, warn};

use crate::{
    client::{Client, KubeClient},
    crd::{CONTROLLER_NAME, OPERATOR_NAME, ZookeeperCluster},
    kvp::format_full_controller_name,
    logging::controller::{ReconcilerError, report_controller_reconciled},
    reconcile::{self, RoleReconciler},
};

/// The delay after which a failed reconciliation is retried.
pub const ERROR_REQUEUE_DELAY: Duration = Duration::from_secs(5);

pub struct Ctx<C> {
    pub client: C,
}

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("failed to reconcile the server role of {cluster}"))]
    ReconcileRole {
        source: reconcile::Error,
        cluster: String,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }
}

pub async fn reconcile_zookeeper<C: Client>(
    zk: Arc<ZookeeperCluster>,
    ctx: Arc<Ctx<C>>,
) -> Result<Action> {
    info!(cluster = %zk.name_any(), "Starting reconcile");

    let outcome = RoleReconciler::new(&zk, &ctx.client)
        .reconcile_role()
        .await
        .with_context(|_| ReconcileRoleSnafu {
            cluster: zk.name_any(),
        })?;

    Ok(outcome.into_action())
}

pub fn error_policy<C>(zk: Arc<ZookeeperCluster>, error: &Error, _ctx: Arc<Ctx<C>>) -> Action {
    warn!(
        cluster = %zk.name_any(),
        error = error as &dyn std::error::Error,
        "reconciliation failed, retrying"
    );
    Action::requeue(ERROR_REQUEUE_DELAY)
}

/// Watches all `ZookeeperCluster` objects and the objects they own until the watch stream ends.
pub async fn run(client: kube::Client) {
    let field_manager = format_full_controller_name(OPERATOR_NAME, CONTROLLER_NAME);
    let ctx = Arc::new(Ctx {
        client: KubeClient::new(client.clone(), &field_manager),
    });

    Controller::new(
        Api::<ZookeeperCluster>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<ServiceAccount>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<ConfigMap>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<PodDisruptionBudget>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<StatefulSet>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(Api::<Service>::all(client), watcher::Config::default())
    .run(
        reconcile_zookeeper::<KubeClient>,
        error_policy::<KubeClient>,
        ctx,
    )
    .for_each(|result| {
        report_controller_reconciled(&field_manager, &result);
        futures::future::ready(())
    })
    .await;
}
