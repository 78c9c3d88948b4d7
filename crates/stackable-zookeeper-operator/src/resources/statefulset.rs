//! The StatefulSet running the servers of a role group.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{StatefulSet, StatefulSetSpec},
        core::v1::{
            ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
            ObjectFieldSelector, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec,
            PodTemplateSpec, Probe, ResourceRequirements, TCPSocketAction, Volume, VolumeMount,
            VolumeResourceRequirements,
        },
    },
    apimachinery::pkg::{
        api::resource::Quantity,
        apis::meta::v1::{LabelSelector, ObjectMeta},
        util::intstr::IntOrString,
    },
};
use snafu::ResultExt;
use tracing::info;

use super::{
    InvalidGracefulShutdownTimeoutSnafu, ResourceBuilder, Result, SharedContext,
    TerminationGracePeriodTooLongSnafu, config_map::first_myid, logging::log_config_map_name,
};
use crate::{
    crd::{
        APP_NAME, CLIENT_PORT, CLIENT_PORT_NAME, DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT,
        DEFAULT_REPLICAS, DEFAULT_STORAGE_CAPACITY, ELECTION_PORT, ELECTION_PORT_NAME,
        FOLLOWER_PORT, FOLLOWER_PORT_NAME, LOGBACK_XML, ResourcesSpec, STACKABLE_CONFIG_DIR,
        STACKABLE_DATA_DIR, STACKABLE_LOG_CONFIG_DIR, ZOO_CFG,
    },
    reconcile::{DEFAULT_REQUEUE_DELAY, ReconcileOutcome},
};

const CONFIG_VOLUME_NAME: &str = "config";
const LOG_CONFIG_VOLUME_NAME: &str = "log-config";
const DATA_VOLUME_NAME: &str = "data";

pub struct StatefulSetBuilder<'a> {
    context: SharedContext<'a>,
}

impl<'a> StatefulSetBuilder<'a> {
    pub fn new(context: SharedContext<'a>) -> Self {
        Self { context }
    }

    fn replicas(&self) -> u16 {
        self.context.spec.replicas.unwrap_or(DEFAULT_REPLICAS)
    }

    fn resources(&self) -> ResourcesSpec {
        self.context
            .spec
            .config
            .as_ref()
            .and_then(|config| config.resources.clone())
            .unwrap_or_default()
    }

    fn termination_grace_period_seconds(&self) -> Result<i64> {
        let value = self
            .context
            .spec
            .config
            .as_ref()
            .and_then(|config| config.graceful_shutdown_timeout.as_deref())
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT);
        let duration = humantime::parse_duration(value)
            .context(InvalidGracefulShutdownTimeoutSnafu { value })?;
        duration
            .as_secs()
            .try_into()
            .context(TerminationGracePeriodTooLongSnafu { duration })
    }

    /// Writes the `myid` of the pod (derived from its ordinal) and starts the server.
    fn command_args(&self) -> String {
        let first_myid = first_myid(self.context.cluster, &self.context.rolegroup_ref.role_group);
        format!(
            "mkdir -p {STACKABLE_DATA_DIR} && \
             echo $(( {first_myid} + ${{POD_NAME##*-}} )) > {STACKABLE_DATA_DIR}/myid && \
             exec bin/zkServer.sh start-foreground {STACKABLE_CONFIG_DIR}/{ZOO_CFG}"
        )
    }

    fn env(&self) -> Vec<EnvVar> {
        let mut jvm_flags = vec![format!(
            "-Dlogback.configurationFile={STACKABLE_LOG_CONFIG_DIR}/{LOGBACK_XML}"
        )];
        if let Some(cli_overrides) = &self.context.spec.cli_overrides {
            jvm_flags.extend(cli_overrides.iter().cloned());
        }

        let mut env = BTreeMap::from([
            ("POD_NAME".to_owned(), EnvVar {
                name: "POD_NAME".to_owned(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        field_path: "metadata.name".to_owned(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ("SERVER_JVMFLAGS".to_owned(), EnvVar {
                name: "SERVER_JVMFLAGS".to_owned(),
                value: Some(jvm_flags.join(" ")),
                ..Default::default()
            }),
        ]);
        // overrides replace generated variables of the same name
        for (name, value) in self.context.spec.env_overrides.iter().flatten() {
            env.insert(name.clone(), EnvVar {
                name: name.clone(),
                value: Some(value.clone()),
                ..Default::default()
            });
        }
        env.into_values().collect()
    }

    fn container(&self) -> Container {
        let image = &self.context.cluster.spec.image;
        let port = |name: &str, port: u16| ContainerPort {
            name: Some(name.to_owned()),
            container_port: i32::from(port),
            protocol: Some("TCP".to_owned()),
            ..Default::default()
        };
        let volume_mount = |name: &str, mount_path: &str| VolumeMount {
            name: name.to_owned(),
            mount_path: mount_path.to_owned(),
            ..Default::default()
        };

        Container {
            name: APP_NAME.to_owned(),
            image: Some(image.image()),
            image_pull_policy: Some(image.pull_policy.clone()),
            command: Some(vec!["/bin/bash".to_owned(), "-c".to_owned()]),
            args: Some(vec![self.command_args()]),
            env: Some(self.env()),
            ports: Some(vec![
                port(CLIENT_PORT_NAME, CLIENT_PORT),
                port(FOLLOWER_PORT_NAME, FOLLOWER_PORT),
                port(ELECTION_PORT_NAME, ELECTION_PORT),
            ]),
            volume_mounts: Some(vec![
                volume_mount(CONFIG_VOLUME_NAME, STACKABLE_CONFIG_DIR),
                volume_mount(LOG_CONFIG_VOLUME_NAME, STACKABLE_LOG_CONFIG_DIR),
                volume_mount(DATA_VOLUME_NAME, STACKABLE_DATA_DIR),
            ]),
            resources: Some(resource_requirements(&self.resources())),
            readiness_probe: Some(Probe {
                tcp_socket: Some(TCPSocketAction {
                    port: IntOrString::String(CLIENT_PORT_NAME.to_owned()),
                    ..Default::default()
                }),
                initial_delay_seconds: Some(10),
                period_seconds: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod_spec(&self) -> Result<PodSpec> {
        let config = self.context.spec.config.clone().unwrap_or_default();
        let object_name = self.context.object_name();
        let config_map_volume = |name: &str, config_map: String| Volume {
            name: name.to_owned(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map,
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok(PodSpec {
            containers: vec![self.container()],
            service_account_name: Some(object_name.clone()),
            node_selector: config.node_selector,
            affinity: config.affinity,
            tolerations: config.tolerations,
            termination_grace_period_seconds: Some(self.termination_grace_period_seconds()?),
            volumes: Some(vec![
                config_map_volume(CONFIG_VOLUME_NAME, object_name.clone()),
                config_map_volume(LOG_CONFIG_VOLUME_NAME, log_config_map_name(&object_name)),
            ]),
            ..Default::default()
        })
    }

    fn data_volume_claim(&self) -> PersistentVolumeClaim {
        let capacity = self
            .resources()
            .storage
            .and_then(|storage| storage.capacity)
            .unwrap_or_else(|| Quantity(DEFAULT_STORAGE_CAPACITY.to_owned()));
        let storage_class_name = self
            .context
            .spec
            .config
            .as_ref()
            .and_then(|config| config.storage_class.clone());

        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(DATA_VOLUME_NAME.to_owned()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_owned()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_owned(), capacity)])),
                    ..Default::default()
                }),
                storage_class_name,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn resource_requirements(resources: &ResourcesSpec) -> ResourceRequirements {
    let mut limits = BTreeMap::new();
    let mut requests = BTreeMap::new();
    if let Some(cpu) = &resources.cpu {
        if let Some(min) = &cpu.min {
            requests.insert("cpu".to_owned(), min.clone());
        }
        if let Some(max) = &cpu.max {
            limits.insert("cpu".to_owned(), max.clone());
        }
    }
    // the memory limit is requested up front
    if let Some(limit) = resources.memory.as_ref().and_then(|memory| memory.limit.as_ref()) {
        requests.insert("memory".to_owned(), limit.clone());
        limits.insert("memory".to_owned(), limit.clone());
    }

    ResourceRequirements {
        limits: (!limits.is_empty()).then_some(limits),
        requests: (!requests.is_empty()).then_some(requests),
        ..Default::default()
    }
}

impl ResourceBuilder for StatefulSetBuilder<'_> {
    type Resource = StatefulSet;

    fn name(&self) -> String {
        self.context.object_name()
    }

    fn build(&self) -> Result<Option<StatefulSet>> {
        let labels = &self.context.labels;

        Ok(Some(StatefulSet {
            metadata: self.context.object_meta(self.name())?,
            spec: Some(StatefulSetSpec {
                replicas: Some(i32::from(self.replicas())),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                service_name: Some(self.context.rolegroup_ref.headless_service_name()),
                pod_management_policy: Some("Parallel".to_owned()),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels.clone()),
                        ..Default::default()
                    }),
                    spec: Some(self.pod_spec()?),
                },
                volume_claim_templates: Some(vec![self.data_volume_claim()]),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }

    /// Ready once every replica reports ready.
    fn readiness(&self, applied: &StatefulSet) -> ReconcileOutcome {
        let desired = i32::from(self.replicas());
        let ready = applied
            .status
            .as_ref()
            .and_then(|status| status.ready_replicas)
            .unwrap_or(0);

        if ready < desired {
            info!(
                statefulset = %self.name(),
                ready, desired, "waiting for replicas to become ready"
            );
            ReconcileOutcome::Requeue(DEFAULT_REQUEUE_DELAY)
        } else {
            ReconcileOutcome::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::StatefulSetStatus;
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::{ConfigSpec, CpuResource, MemoryResource},
        resources::{
            Error,
            tests::{cluster, context},
        },
    };

    fn build(role_group: &str) -> StatefulSet {
        let cluster = cluster();
        StatefulSetBuilder::new(context(&cluster, role_group))
            .build()
            .unwrap()
            .expect("always built")
    }

    fn container(statefulset: &StatefulSet) -> Container {
        statefulset
            .spec
            .clone()
            .unwrap()
            .template
            .spec
            .unwrap()
            .containers
            .remove(0)
    }

    #[test]
    fn statefulset_spec() {
        let statefulset = build("analytics");

        let spec = statefulset.spec.clone().unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(
            spec.service_name.as_deref(),
            Some("simple-zk-server-analytics-headless")
        );
        assert_eq!(
            spec.selector.match_labels.unwrap()["app.kubernetes.io/instance"],
            "analytics"
        );

        let pod_spec = spec.template.spec.unwrap();
        assert_eq!(
            pod_spec.service_account_name.as_deref(),
            Some("simple-zk-server-analytics")
        );
        assert_eq!(pod_spec.node_selector.unwrap()["tier"], "analytics");
        assert_eq!(pod_spec.termination_grace_period_seconds, Some(120));
        let config_maps: Vec<String> = pod_spec
            .volumes
            .unwrap()
            .into_iter()
            .filter_map(|volume| volume.config_map.map(|config_map| config_map.name))
            .collect();
        assert_eq!(config_maps, [
            "simple-zk-server-analytics",
            "simple-zk-server-analytics-log"
        ]);

        let claim = &spec.volume_claim_templates.unwrap()[0];
        assert_eq!(
            claim.spec.as_ref().unwrap().resources.as_ref().unwrap().requests,
            Some(BTreeMap::from([(
                "storage".to_owned(),
                Quantity("1Gi".to_owned())
            )]))
        );
    }

    #[test]
    fn myid_offset_follows_role_group_order() {
        let args = container(&build("default")).args.unwrap().remove(0);

        assert!(args.contains("echo $(( 3 + ${POD_NAME##*-} ))"));
        assert!(args.contains("/stackable/config/zoo.cfg"));
    }

    #[test]
    fn env_overrides_replace_generated_variables() {
        let mut cluster = cluster();
        let server = &mut cluster.spec.server;
        server.cli_overrides = Some(vec!["-Xmx512m".to_owned()]);
        server.env_overrides = Some(BTreeMap::from([
            ("SERVER_JVMFLAGS".to_owned(), "-Xmx1g".to_owned()),
            ("ZOO_LOG_DIR".to_owned(), "/tmp".to_owned()),
        ]));
        let statefulset = StatefulSetBuilder::new(context(&cluster, "default"))
            .build()
            .unwrap()
            .unwrap();

        let env: BTreeMap<String, Option<String>> = container(&statefulset)
            .env
            .unwrap()
            .into_iter()
            .map(|var| (var.name, var.value))
            .collect();
        assert_eq!(env["SERVER_JVMFLAGS"].as_deref(), Some("-Xmx1g"));
        assert_eq!(env["ZOO_LOG_DIR"].as_deref(), Some("/tmp"));
        assert_eq!(env["POD_NAME"], None);
    }

    #[test]
    fn cli_overrides_are_passed_to_the_jvm() {
        let mut cluster = cluster();
        cluster.spec.server.cli_overrides = Some(vec!["-Xmx512m".to_owned()]);
        let statefulset = StatefulSetBuilder::new(context(&cluster, "default"))
            .build()
            .unwrap()
            .unwrap();

        let jvm_flags = container(&statefulset)
            .env
            .unwrap()
            .into_iter()
            .find(|var| var.name == "SERVER_JVMFLAGS")
            .and_then(|var| var.value)
            .unwrap();
        assert_eq!(
            jvm_flags,
            "-Dlogback.configurationFile=/stackable/log_config/logback.xml -Xmx512m"
        );
    }

    #[test]
    fn resources() {
        let requirements = resource_requirements(&ResourcesSpec {
            cpu: Some(CpuResource {
                min: Some(Quantity("250m".to_owned())),
                max: Some(Quantity("1".to_owned())),
            }),
            memory: Some(MemoryResource {
                limit: Some(Quantity("1Gi".to_owned())),
            }),
            storage: None,
        });

        let requests = requirements.requests.unwrap();
        let limits = requirements.limits.unwrap();
        assert_eq!(requests["cpu"], Quantity("250m".to_owned()));
        assert_eq!(requests["memory"], Quantity("1Gi".to_owned()));
        assert_eq!(limits["cpu"], Quantity("1".to_owned()));
        assert_eq!(limits["memory"], Quantity("1Gi".to_owned()));
        assert_eq!(
            resource_requirements(&ResourcesSpec::default()),
            ResourceRequirements::default()
        );
    }

    #[test]
    fn invalid_graceful_shutdown_timeout() {
        let mut cluster = cluster();
        cluster.spec.server.config = Some(ConfigSpec {
            graceful_shutdown_timeout: Some("soon".to_owned()),
            ..Default::default()
        });

        let error = StatefulSetBuilder::new(context(&cluster, "default"))
            .build()
            .unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidGracefulShutdownTimeout { value, .. } if value == "soon"
        ));
    }

    #[rstest]
    #[case::no_status(None, false)]
    #[case::partially_ready(Some(2), false)]
    #[case::ready(Some(3), true)]
    fn readiness(#[case] ready_replicas: Option<i32>, #[case] done: bool) {
        let cluster = cluster();
        let builder = StatefulSetBuilder::new(context(&cluster, "default"));
        let mut applied = builder.build().unwrap().unwrap();
        applied.status = ready_replicas.map(|ready_replicas| StatefulSetStatus {
            ready_replicas: Some(ready_replicas),
            replicas: 3,
            ..Default::default()
        });

        let outcome = builder.readiness(&applied);

        if done {
            assert_eq!(outcome, ReconcileOutcome::Done);
        } else {
            assert_eq!(outcome, ReconcileOutcome::Requeue(DEFAULT_REQUEUE_DELAY));
        }
    }
}
