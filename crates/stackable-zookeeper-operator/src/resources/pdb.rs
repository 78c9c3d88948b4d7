use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::ResourceExt;
use snafu::ResultExt;

use super::{ObjectMetaSnafu, ResourceBuilder, Result, RoleGroupContext};
use crate::{
    builder::{
        meta::ObjectMetaBuilder,
        pdb::{PodDisruptionBudgetBuilder, PodDisruptionBudgetConstraint},
    },
    crd::{APP_NAME, PodDisruptionBudgetSpec, ZookeeperCluster, ZookeeperRole},
    kvp::{Labels, role_selector_labels},
};

/// The PodDisruptionBudget of the whole server role or of a single role group.
///
/// Nothing is written if no policy is declared or the policy is disabled.
pub struct PdbBuilder<'a> {
    cluster: &'a ZookeeperCluster,
    name: String,
    labels: Labels,
    selector_labels: Labels,
    policy: Option<PodDisruptionBudgetSpec>,
}

impl<'a> PdbBuilder<'a> {
    /// Covers every pod of the server role, whatever role group it belongs to.
    pub fn for_role(cluster: &'a ZookeeperCluster, role_labels: &Labels) -> Self {
        let role = ZookeeperRole::Server;
        Self {
            cluster,
            name: format!("{}-{role}", cluster.name_any()),
            labels: role_labels.clone(),
            selector_labels: role_selector_labels(cluster, APP_NAME, role.into()),
            policy: cluster.spec.server.pod_disruption_budget().cloned(),
        }
    }

    pub fn for_role_group(context: &RoleGroupContext<'a>) -> Self {
        Self {
            cluster: context.cluster,
            name: context.object_name(),
            labels: context.labels.clone(),
            selector_labels: context.labels.clone(),
            policy: context.spec.pod_disruption_budget().cloned(),
        }
    }
}

impl ResourceBuilder for PdbBuilder<'_> {
    type Resource = PodDisruptionBudget;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn build(&self) -> Result<Option<PodDisruptionBudget>> {
        let Some(constraint) = self
            .policy
            .as_ref()
            .and_then(PodDisruptionBudgetConstraint::from_config)
        else {
            return Ok(None);
        };

        let metadata = ObjectMetaBuilder::new()
            .name(self.name.clone())
            .owned_by(self.cluster)
            .context(ObjectMetaSnafu)?
            .with_labels(self.labels.clone())
            .build();
        Ok(Some(
            PodDisruptionBudgetBuilder::new()
                .new_with_metadata(metadata)
                .with_selector_labels(self.selector_labels.clone())
                .with_constraint(constraint)
                .build(),
        ))
    }
}
