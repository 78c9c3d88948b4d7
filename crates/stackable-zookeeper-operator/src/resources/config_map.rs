//! The `zoo.cfg` of a role group.
//!
//! Every server has to know the whole ensemble, so the generated configuration lists the
//! servers of all role groups, not just the ones of the role group it belongs to.
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use snafu::OptionExt;

use super::{ObjectHasNoNamespaceSnafu, ResourceBuilder, Result, SharedContext};
use crate::{
    crd::{
        CLIENT_PORT, DEFAULT_INIT_LIMIT, DEFAULT_MAX_CLIENT_CNXNS, DEFAULT_REPLICAS,
        DEFAULT_SYNC_LIMIT, DEFAULT_TICK_TIME, ELECTION_PORT, FOLLOWER_PORT, STACKABLE_DATA_DIR,
        ZOO_CFG, ZookeeperCluster, ZookeeperRole,
    },
    role_utils::{RoleGroupRef, merge_role_group_config},
};

/// One server of the ensemble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsembleMember {
    /// The id written to the `myid` file of the server, unique within the cluster.
    pub myid: u32,
    pub host: String,
}

/// The effective replica count of every role group, in role group order.
fn role_group_replicas(cluster: &ZookeeperCluster) -> impl Iterator<Item = (&String, u16)> {
    let server = &cluster.spec.server;
    server.role_groups.iter().map(move |(name, role_group)| {
        let replicas = merge_role_group_config(server, role_group)
            .replicas
            .unwrap_or(DEFAULT_REPLICAS);
        (name, replicas)
    })
}

/// The `myid` of the first server of `role_group`.
///
/// Ids start at 1 and are handed out consecutively, role group by role group.
pub fn first_myid(cluster: &ZookeeperCluster, role_group: &str) -> u32 {
    1 + role_group_replicas(cluster)
        .take_while(|(name, _)| name.as_str() != role_group)
        .map(|(_, replicas)| u32::from(replicas))
        .sum::<u32>()
}

/// All servers of the cluster, addressed through the headless Service of their role group.
pub fn ensemble(cluster: &ZookeeperCluster) -> Result<Vec<EnsembleMember>> {
    let namespace = cluster.namespace().context(ObjectHasNoNamespaceSnafu)?;
    let cluster_domain = &cluster.spec.cluster_config.cluster_domain;

    let mut members = Vec::new();
    let mut myid = 1;
    for (role_group, replicas) in role_group_replicas(cluster) {
        let rolegroup_ref = RoleGroupRef::new(cluster, ZookeeperRole::Server, role_group);
        let statefulset_name = rolegroup_ref.object_name();
        let service_name = rolegroup_ref.headless_service_name();
        for ordinal in 0..replicas {
            members.push(EnsembleMember {
                myid,
                host: format!(
                    "{statefulset_name}-{ordinal}.{service_name}.{namespace}.svc.{cluster_domain}"
                ),
            });
            myid += 1;
        }
    }
    Ok(members)
}

/// Renders properties as `key=value` lines.
fn to_properties(properties: &BTreeMap<String, String>) -> String {
    properties
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

pub struct ConfigMapBuilder<'a> {
    context: SharedContext<'a>,
}

impl<'a> ConfigMapBuilder<'a> {
    pub fn new(context: SharedContext<'a>) -> Self {
        Self { context }
    }

    fn zoo_cfg(&self) -> Result<String> {
        let config = self.context.spec.config.clone().unwrap_or_default();

        let mut properties = BTreeMap::from([
            (
                "tickTime".to_owned(),
                config.tick_time.unwrap_or(DEFAULT_TICK_TIME).to_string(),
            ),
            (
                "initLimit".to_owned(),
                config.init_limit.unwrap_or(DEFAULT_INIT_LIMIT).to_string(),
            ),
            (
                "syncLimit".to_owned(),
                config.sync_limit.unwrap_or(DEFAULT_SYNC_LIMIT).to_string(),
            ),
            (
                "maxClientCnxns".to_owned(),
                config
                    .max_client_cnxns
                    .unwrap_or(DEFAULT_MAX_CLIENT_CNXNS)
                    .to_string(),
            ),
            ("dataDir".to_owned(), STACKABLE_DATA_DIR.to_owned()),
            ("clientPort".to_owned(), CLIENT_PORT.to_string()),
        ]);
        properties.extend(ensemble(self.context.cluster)?.into_iter().map(|member| {
            (
                format!("server.{}", member.myid),
                format!(
                    "{}:{FOLLOWER_PORT}:{ELECTION_PORT};{CLIENT_PORT}",
                    member.host
                ),
            )
        }));
        if let Some(overrides) = &self.context.spec.config_overrides {
            properties.extend(overrides.clone());
        }

        Ok(to_properties(&properties))
    }
}

impl ResourceBuilder for ConfigMapBuilder<'_> {
    type Resource = ConfigMap;

    fn name(&self) -> String {
        self.context.object_name()
    }

    fn build(&self) -> Result<Option<ConfigMap>> {
        Ok(Some(ConfigMap {
            metadata: self.context.object_meta(self.name())?,
            data: Some(BTreeMap::from([(ZOO_CFG.to_owned(), self.zoo_cfg()?)])),
            ..Default::default()
        }))
    }
}
