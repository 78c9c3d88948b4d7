//! The `ZookeeperCluster` custom resource and the configuration types nested below it.
//!
//! The server role follows the usual role / role group layout:
//!
//! ```yaml
//! server:
//!   config:
//!     tickTime: 2000
//!     podDisruptionBudget:
//!       maxUnavailable: 1
//!   replicas: 3
//!   roleGroups:
//!     default: {}
//!     analytics:
//!       replicas: 5
//!       config:
//!         nodeSelector:
//!           tier: analytics
//! ```
//!
//! Every field of a role group may be left unset, in which case it is inherited from the role.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{Affinity, Toleration},
    apimachinery::pkg::api::resource::Quantity,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::config::merge::{Atomic, Merge, merge_block};

pub mod logging;

pub use logging::{LogLevel, LoggingSpec};

pub const APP_NAME: &str = "zookeeper";
pub const OPERATOR_NAME: &str = "zookeeper.stackable.tech";
pub const CONTROLLER_NAME: &str = "zookeepercluster";

pub const CLIENT_PORT_NAME: &str = "client";
pub const CLIENT_PORT: u16 = 2181;
pub const FOLLOWER_PORT_NAME: &str = "follower";
pub const FOLLOWER_PORT: u16 = 2888;
pub const ELECTION_PORT_NAME: &str = "election";
pub const ELECTION_PORT: u16 = 3888;

pub const STACKABLE_CONFIG_DIR: &str = "/stackable/config";
pub const STACKABLE_LOG_CONFIG_DIR: &str = "/stackable/log_config";
pub const STACKABLE_DATA_DIR: &str = "/stackable/data";

pub const ZOO_CFG: &str = "zoo.cfg";
pub const LOGBACK_XML: &str = "logback.xml";

pub const DEFAULT_REPLICAS: u16 = 1;
pub const DEFAULT_TICK_TIME: u32 = 2000;
pub const DEFAULT_INIT_LIMIT: u32 = 10;
pub const DEFAULT_SYNC_LIMIT: u32 = 5;
pub const DEFAULT_MAX_CLIENT_CNXNS: u32 = 60;
pub const DEFAULT_STORAGE_CAPACITY: &str = "1Gi";
pub const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT: &str = "2m";
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// A ZooKeeper ensemble.
#[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "zookeeper.stackable.tech",
    version = "v1alpha1",
    kind = "ZookeeperCluster",
    plural = "zookeeperclusters",
    shortname = "zk",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperClusterSpec {
    #[serde(default)]
    pub image: ImageSpec,

    #[serde(default)]
    pub cluster_config: ClusterConfigSpec,

    pub server: ServerSpec,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    #[serde(default = "default_image_repository")]
    pub repository: String,

    #[serde(default = "default_image_tag")]
    pub tag: String,

    #[serde(default = "default_image_pull_policy")]
    pub pull_policy: String,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            repository: default_image_repository(),
            tag: default_image_tag(),
            pull_policy: default_image_pull_policy(),
        }
    }
}

impl ImageSpec {
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

fn default_image_repository() -> String {
    "oci.stackable.tech/sdp/zookeeper".to_owned()
}

fn default_image_tag() -> String {
    "3.9.3-stackable0.0.0-dev".to_owned()
}

fn default_image_pull_policy() -> String {
    "IfNotPresent".to_owned()
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigSpec {
    /// The Kubernetes cluster domain, used to build the fully qualified names of the ensemble
    /// members. Defaults to `cluster.local`.
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,
}

impl Default for ClusterConfigSpec {
    fn default() -> Self {
        Self {
            cluster_domain: default_cluster_domain(),
        }
    }
}

fn default_cluster_domain() -> String {
    DEFAULT_CLUSTER_DOMAIN.to_owned()
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum ZookeeperRole {
    Server,
}

/// The server role: role-wide defaults plus the role groups that inherit them.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub config: Option<ConfigSpec>,

    pub replicas: Option<u16>,

    /// Entries written to `zoo.cfg` after all generated properties.
    pub config_overrides: Option<BTreeMap<String, String>>,

    pub env_overrides: Option<BTreeMap<String, String>>,

    /// Extra JVM arguments passed to the server.
    pub cli_overrides: Option<Vec<String>>,

    #[serde(default)]
    pub role_groups: BTreeMap<String, RoleGroupSpec>,
}

impl ServerSpec {
    /// The role-wide values in role group shape, so they can be merged below a role group.
    ///
    /// `role_groups` has no counterpart in [`RoleGroupSpec`], a role group never sees its
    /// siblings.
    pub fn role_group_defaults(&self) -> RoleGroupSpec {
        let Self {
            config,
            replicas,
            config_overrides,
            env_overrides,
            cli_overrides,
            role_groups: _,
        } = self;

        RoleGroupSpec {
            config: config.clone(),
            replicas: *replicas,
            config_overrides: config_overrides.clone(),
            env_overrides: env_overrides.clone(),
            cli_overrides: cli_overrides.clone(),
        }
    }

    /// The role-wide disruption budget policy, if one is declared.
    pub fn pod_disruption_budget(&self) -> Option<&PodDisruptionBudgetSpec> {
        self.config.as_ref()?.pod_disruption_budget.as_ref()
    }
}

/// A role group. Unset fields are inherited from the [`ServerSpec`].
///
/// After merging (see [`crate::role_utils::merge_role_group_config`]) the same type carries the
/// effective configuration of the role group.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGroupSpec {
    pub config: Option<ConfigSpec>,

    pub replicas: Option<u16>,

    pub config_overrides: Option<BTreeMap<String, String>>,

    pub env_overrides: Option<BTreeMap<String, String>>,

    pub cli_overrides: Option<Vec<String>>,
}

impl RoleGroupSpec {
    pub fn node_selector(&self) -> Option<&BTreeMap<String, String>> {
        self.config.as_ref()?.node_selector.as_ref()
    }

    pub fn pod_disruption_budget(&self) -> Option<&PodDisruptionBudgetSpec> {
        self.config.as_ref()?.pod_disruption_budget.as_ref()
    }
}

impl Merge for RoleGroupSpec {
    fn merge(&mut self, defaults: &Self) {
        merge_block(&mut self.config, &defaults.config);
        self.replicas.merge(&defaults.replicas);
        self.config_overrides.merge(&defaults.config_overrides);
        self.env_overrides.merge(&defaults.env_overrides);
        self.cli_overrides.merge(&defaults.cli_overrides);
    }
}

/// Configuration shared between the role and its role groups.
///
/// The nested blocks (`resources`, `logging`, ...) are merged as a whole.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    pub resources: Option<ResourcesSpec>,

    pub affinity: Option<Affinity>,

    pub tolerations: Option<Vec<Toleration>>,

    /// Node labels the pods are scheduled on. The same labels are attached to every object of
    /// the role group.
    pub node_selector: Option<BTreeMap<String, String>>,

    pub pod_disruption_budget: Option<PodDisruptionBudgetSpec>,

    /// Time the server gets to shut down gracefully, e.g. `2m` or `30s`.
    pub graceful_shutdown_timeout: Option<String>,

    pub storage_class: Option<String>,

    pub logging: Option<LoggingSpec>,

    pub tick_time: Option<u32>,

    pub init_limit: Option<u32>,

    pub sync_limit: Option<u32>,

    pub max_client_cnxns: Option<u32>,
}

impl Merge for ConfigSpec {
    fn merge(&mut self, defaults: &Self) {
        self.resources.merge(&defaults.resources);
        self.affinity.merge(&defaults.affinity);
        self.tolerations.merge(&defaults.tolerations);
        self.node_selector.merge(&defaults.node_selector);
        self.pod_disruption_budget
            .merge(&defaults.pod_disruption_budget);
        self.graceful_shutdown_timeout
            .merge(&defaults.graceful_shutdown_timeout);
        self.storage_class.merge(&defaults.storage_class);
        self.logging.merge(&defaults.logging);
        self.tick_time.merge(&defaults.tick_time);
        self.init_limit.merge(&defaults.init_limit);
        self.sync_limit.merge(&defaults.sync_limit);
        self.max_client_cnxns.merge(&defaults.max_client_cnxns);
    }
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    pub cpu: Option<CpuResource>,
    pub memory: Option<MemoryResource>,
    pub storage: Option<StorageResource>,
}

impl Atomic for ResourcesSpec {}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuResource {
    pub min: Option<Quantity>,
    pub max: Option<Quantity>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResource {
    pub limit: Option<Quantity>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResource {
    pub capacity: Option<Quantity>,
}

/// Controls the PodDisruptionBudget written for a role or role group.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDisruptionBudgetSpec {
    /// Whether a PodDisruptionBudget should be written out.
    /// Disabling this enables you to specify your own - custom - one.
    /// Defaults to true.
    #[serde(default = "default_pdb_enabled")]
    pub enabled: bool,

    /// The number of Pods that are allowed to be down because of voluntary disruptions.
    /// Takes precedence over `minAvailable`. Defaults to 1 if neither is set.
    pub max_unavailable: Option<u16>,

    pub min_available: Option<u16>,
}

impl Default for PodDisruptionBudgetSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            max_unavailable: None,
            min_available: None,
        }
    }
}

impl Atomic for PodDisruptionBudgetSpec {}

fn default_pdb_enabled() -> bool {
    true
}
