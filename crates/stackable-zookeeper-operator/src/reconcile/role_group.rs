use std::sync::Arc;

use tracing::{Instrument, debug, info_span};

use super::{ReconcileOutcome, ResourceReconciler, Result, reconcile_in_order};
use crate::{
    client::Client,
    crd::{RoleGroupSpec, ZookeeperCluster, ZookeeperRole},
    kvp::{Labels, merge_labels},
    resources::{
        RoleGroupContext, boxed, config_map::ConfigMapBuilder, logging::LogConfigMapBuilder,
        pdb::PdbBuilder, service::HeadlessServiceBuilder,
        service_account::ServiceAccountBuilder, statefulset::StatefulSetBuilder,
    },
    role_utils::{RoleGroupRef, merge_role_group_config},
};

/// Reconciles the child objects of one role group.
///
/// The role group spec is merged with the role spec once, when the reconciler is created. The
/// objects are then reconciled in a fixed order: ServiceAccount, ConfigMap, logging ConfigMap,
/// PodDisruptionBudget, StatefulSet and finally the headless Service.
pub struct RoleGroupReconciler<'a> {
    context: Arc<RoleGroupContext<'a>>,
    reconcilers: Vec<Box<dyn ResourceReconciler + 'a>>,
}

impl<'a> RoleGroupReconciler<'a> {
    pub fn new<C: Client>(
        cluster: &'a ZookeeperCluster,
        client: &'a C,
        role_group_name: &str,
        role_group: &RoleGroupSpec,
        role_labels: &Labels,
    ) -> Self {
        let spec = merge_role_group_config(&cluster.spec.server, role_group);
        let labels = merge_labels(role_labels, &spec, role_group_name);
        let context = Arc::new(RoleGroupContext {
            cluster,
            rolegroup_ref: RoleGroupRef::new(cluster, ZookeeperRole::Server, role_group_name),
            spec,
            labels,
        });

        let reconcilers = vec![
            boxed(client, ServiceAccountBuilder::new(Arc::clone(&context))),
            boxed(client, ConfigMapBuilder::new(Arc::clone(&context))),
            boxed(client, LogConfigMapBuilder::new(Arc::clone(&context))),
            boxed(client, PdbBuilder::for_role_group(&context)),
            boxed(client, StatefulSetBuilder::new(Arc::clone(&context))),
            boxed(client, HeadlessServiceBuilder::new(Arc::clone(&context))),
        ];

        Self {
            context,
            reconcilers,
        }
    }

    pub async fn reconcile_group(&self) -> Result {
        let rolegroup_ref = &self.context.rolegroup_ref;
        let span = info_span!("reconcile_role_group", role_group = %rolegroup_ref);

        async {
            let outcome = reconcile_in_order(&self.reconcilers).await?;
            if let ReconcileOutcome::Requeue(delay) = outcome {
                debug!(?delay, "role group is not ready yet");
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}
