//! Utilities for dealing with the server role and its role groups.
//!
//! A role group only exists as the combination of its own spec and the spec of its role, see
//! [`merge_role_group_config`].
use std::fmt::Display;

use kube::runtime::reflector::ObjectRef;

use crate::{
    config::merge::merge,
    crd::{RoleGroupSpec, ServerSpec, ZookeeperCluster, ZookeeperRole},
};

/// Computes the effective spec of a role group.
///
/// Every field set on `role_group` is kept, every unset field falls back to the value of `role`
/// (and stays unset if the role does not set it either). If both sides carry a `config` block,
/// the blocks are merged field by field. The role group mapping of `role` is never part of the
/// result.
///
/// Neither input is modified, the merge works on a copy of `role_group`.
pub fn merge_role_group_config(role: &ServerSpec, role_group: &RoleGroupSpec) -> RoleGroupSpec {
    merge(role_group.clone(), &role.role_group_defaults())
}

/// A reference to a named role group of a given cluster object
#[derive(Clone, Debug)]
pub struct RoleGroupRef {
    pub cluster: ObjectRef<ZookeeperCluster>,
    pub role: String,
    pub role_group: String,
}

impl RoleGroupRef {
    pub fn new(cluster: &ZookeeperCluster, role: ZookeeperRole, role_group: &str) -> Self {
        Self {
            cluster: ObjectRef::from_obj(cluster),
            role: role.to_string(),
            role_group: role_group.to_owned(),
        }
    }

    /// The name shared by all objects of the role group, `{cluster}-{role}-{role_group}`.
    ///
    /// The role group name is lower-cased, like the `app.kubernetes.io/instance` label.
    pub fn object_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.cluster.name,
            self.role,
            self.role_group.to_lowercase()
        )
    }

    /// The governing Service of the role group StatefulSet.
    pub fn headless_service_name(&self) -> String {
        format!("{}-headless", self.object_name())
    }
}

impl Display for RoleGroupRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "role group {}/{} of {}",
            self.role, self.role_group, self.cluster
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::{
        api::core::v1::{Affinity, NodeAffinity, PodAntiAffinity, Toleration},
        apimachinery::pkg::api::resource::Quantity,
    };
    use rstest::rstest;

    use super::*;
    use crate::crd::{
        ConfigSpec, CpuResource, LogLevel, LoggingSpec, MemoryResource, PodDisruptionBudgetSpec,
        ResourcesSpec,
    };

    fn role() -> ServerSpec {
        ServerSpec {
            config: Some(ConfigSpec {
                tick_time: Some(3000),
                init_limit: Some(20),
                graceful_shutdown_timeout: Some("5m".to_owned()),
                node_selector: Some(BTreeMap::from([("tier".to_owned(), "server".to_owned())])),
                resources: Some(ResourcesSpec {
                    memory: Some(MemoryResource {
                        limit: Some(Quantity("2Gi".to_owned())),
                    }),
                    ..Default::default()
                }),
                pod_disruption_budget: Some(PodDisruptionBudgetSpec {
                    max_unavailable: Some(1),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            replicas: Some(3),
            config_overrides: Some(BTreeMap::from([(
                "autopurge.purgeInterval".to_owned(),
                "1".to_owned(),
            )])),
            env_overrides: None,
            cli_overrides: Some(vec!["-Dzookeeper.admin.enableServer=false".to_owned()]),
            role_groups: BTreeMap::from([
                ("default".to_owned(), RoleGroupSpec::default()),
                (
                    "analytics".to_owned(),
                    RoleGroupSpec {
                        replicas: Some(5),
                        ..Default::default()
                    },
                ),
            ]),
        }
    }

    /// [`role`] with every field of the role group shape set.
    fn fully_configured_role() -> ServerSpec {
        let mut role = role();
        role.env_overrides = Some(BTreeMap::from([("ZK_HEAP".to_owned(), "1g".to_owned())]));
        let config = role.config.get_or_insert_with(ConfigSpec::default);
        config.affinity = Some(Affinity {
            node_affinity: Some(NodeAffinity::default()),
            ..Default::default()
        });
        config.tolerations = Some(vec![Toleration {
            key: Some("dedicated".to_owned()),
            ..Default::default()
        }]);
        config.storage_class = Some("standard".to_owned());
        config.logging = Some(LoggingSpec {
            root_level: Some(LogLevel::Info),
            ..Default::default()
        });
        config.sync_limit = Some(5);
        config.max_client_cnxns = Some(60);
        role
    }

    fn config(role_group: &mut RoleGroupSpec) -> &mut ConfigSpec {
        role_group.config.get_or_insert_with(ConfigSpec::default)
    }

    #[rstest]
    #[case::replicas(|group: &mut RoleGroupSpec| group.replicas = Some(5))]
    #[case::config_overrides(|group: &mut RoleGroupSpec| {
        group.config_overrides = Some(BTreeMap::from([(
            "autopurge.purgeInterval".to_owned(),
            "24".to_owned(),
        )]));
    })]
    #[case::env_overrides(|group: &mut RoleGroupSpec| {
        group.env_overrides = Some(BTreeMap::from([("ZK_HEAP".to_owned(), "4g".to_owned())]));
    })]
    #[case::cli_overrides(|group: &mut RoleGroupSpec| {
        group.cli_overrides = Some(vec!["-Dzookeeper.snapCount=1000".to_owned()]);
    })]
    #[case::resources(|group: &mut RoleGroupSpec| {
        config(group).resources = Some(ResourcesSpec {
            cpu: Some(CpuResource {
                min: Some(Quantity("500m".to_owned())),
                max: None,
            }),
            ..Default::default()
        });
    })]
    #[case::affinity(|group: &mut RoleGroupSpec| {
        config(group).affinity = Some(Affinity {
            pod_anti_affinity: Some(PodAntiAffinity::default()),
            ..Default::default()
        });
    })]
    #[case::tolerations(|group: &mut RoleGroupSpec| {
        config(group).tolerations = Some(vec![Toleration {
            key: Some("analytics".to_owned()),
            ..Default::default()
        }]);
    })]
    #[case::node_selector(|group: &mut RoleGroupSpec| {
        config(group).node_selector =
            Some(BTreeMap::from([("tier".to_owned(), "analytics".to_owned())]));
    })]
    #[case::pod_disruption_budget(|group: &mut RoleGroupSpec| {
        config(group).pod_disruption_budget = Some(PodDisruptionBudgetSpec {
            enabled: false,
            ..Default::default()
        });
    })]
    #[case::graceful_shutdown_timeout(|group: &mut RoleGroupSpec| {
        config(group).graceful_shutdown_timeout = Some("30s".to_owned());
    })]
    #[case::storage_class(|group: &mut RoleGroupSpec| {
        config(group).storage_class = Some("fast".to_owned());
    })]
    #[case::logging(|group: &mut RoleGroupSpec| {
        config(group).logging = Some(LoggingSpec {
            console_level: Some(LogLevel::Warn),
            ..Default::default()
        });
    })]
    #[case::tick_time(|group: &mut RoleGroupSpec| config(group).tick_time = Some(1000))]
    #[case::init_limit(|group: &mut RoleGroupSpec| config(group).init_limit = Some(5))]
    #[case::sync_limit(|group: &mut RoleGroupSpec| config(group).sync_limit = Some(2))]
    #[case::max_client_cnxns(|group: &mut RoleGroupSpec| config(group).max_client_cnxns = Some(0))]
    fn role_group_value_wins(#[case] set: fn(&mut RoleGroupSpec)) {
        let role = fully_configured_role();
        let mut role_group = RoleGroupSpec::default();
        set(&mut role_group);

        let merged = merge_role_group_config(&role, &role_group);

        // the role defaults with only this one field replaced by the role group value
        let mut expected = role.role_group_defaults();
        set(&mut expected);
        assert_ne!(expected, role.role_group_defaults());
        assert_eq!(merged, expected);
    }

    #[rstest]
    #[case::inherit(None, Some(3))]
    #[case::override_wins(Some(5), Some(5))]
    #[case::explicit_zero_is_kept(Some(0), Some(0))]
    fn merge_replicas(#[case] group_replicas: Option<u16>, #[case] expected: Option<u16>) {
        let role_group = RoleGroupSpec {
            replicas: group_replicas,
            ..Default::default()
        };

        let merged = merge_role_group_config(&role(), &role_group);

        assert_eq!(merged.replicas, expected);
    }

    #[test]
    fn unset_on_both_sides_stays_unset() {
        let merged = merge_role_group_config(&role(), &RoleGroupSpec::default());

        assert_eq!(merged.env_overrides, None);
        let config = merged.config.expect("config inherited from role");
        assert_eq!(config.sync_limit, None);
        assert_eq!(config.logging, None);
    }

    #[test]
    fn empty_role_group_inherits_everything() {
        let role = role();

        let merged = merge_role_group_config(&role, &RoleGroupSpec::default());

        assert_eq!(merged, role.role_group_defaults());
    }

    #[test]
    fn config_blocks_are_merged_field_by_field() {
        let role_group = RoleGroupSpec {
            config: Some(ConfigSpec {
                tick_time: Some(1000),
                sync_limit: Some(2),
                logging: Some(LoggingSpec {
                    root_level: Some(LogLevel::Debug),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge_role_group_config(&role(), &role_group);
        let config = merged.config.expect("merged config");

        // set on the role group
        assert_eq!(config.tick_time, Some(1000));
        assert_eq!(config.sync_limit, Some(2));
        assert_eq!(
            config.logging.and_then(|logging| logging.root_level),
            Some(LogLevel::Debug)
        );
        // inherited from the role
        assert_eq!(config.init_limit, Some(20));
        assert_eq!(config.graceful_shutdown_timeout.as_deref(), Some("5m"));
        assert_eq!(
            config.pod_disruption_budget.and_then(|pdb| pdb.max_unavailable),
            Some(1)
        );
    }

    #[test]
    fn nested_blocks_in_config_are_atomic() {
        let role_group = RoleGroupSpec {
            config: Some(ConfigSpec {
                resources: Some(ResourcesSpec::default()),
                node_selector: Some(BTreeMap::from([("disk".to_owned(), "ssd".to_owned())])),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge_role_group_config(&role(), &role_group);
        let config = merged.config.expect("merged config");

        assert_eq!(config.resources, Some(ResourcesSpec::default()));
        assert_eq!(
            config.node_selector,
            Some(BTreeMap::from([("disk".to_owned(), "ssd".to_owned())]))
        );
    }

    #[test]
    fn merge_is_idempotent_and_pure() {
        let role = role();
        let role_before = role.clone();
        let role_group = role.role_groups["analytics"].clone();
        let role_group_before = role_group.clone();

        let first = merge_role_group_config(&role, &role_group);
        let second = merge_role_group_config(&role, &role_group);

        assert_eq!(first, second);
        assert_eq!(role, role_before);
        assert_eq!(role_group, role_group_before);
    }

    #[test]
    fn merge_does_not_leak_role_groups() {
        let merged = merge_role_group_config(&role(), &RoleGroupSpec::default());

        let serialized = serde_json::to_value(&merged).expect("serializable spec");
        assert!(serialized.get("roleGroups").is_none());
    }

    #[test]
    fn role_group_ref() {
        let rolegroup_ref = RoleGroupRef {
            cluster: ObjectRef::new("simple-zk").within("default"),
            role: "server".to_owned(),
            role_group: "default".to_owned(),
        };

        assert_eq!(rolegroup_ref.object_name(), "simple-zk-server-default");
        assert_eq!(
            rolegroup_ref.headless_service_name(),
            "simple-zk-server-default-headless"
        );
        let display = rolegroup_ref.to_string();
        assert!(display.starts_with("role group server/default of ZookeeperCluster"));
        assert!(display.contains("simple-zk"));
    }

    #[test]
    fn object_name_is_lowercase() {
        let rolegroup_ref = RoleGroupRef {
            cluster: ObjectRef::new("simple-zk").within("default"),
            role: "server".to_owned(),
            role_group: "Analytics".to_owned(),
        };

        assert_eq!(rolegroup_ref.object_name(), "simple-zk-server-analytics");
        assert_eq!(
            rolegroup_ref.headless_service_name(),
            "simple-zk-server-analytics-headless"
        );
        // the original name still identifies the role group in the cluster spec
        assert_eq!(rolegroup_ref.role_group, "Analytics");
    }
}
