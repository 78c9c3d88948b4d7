use tracing::{debug, info};

use super::{
    ReconcileOutcome, ResourceReconciler, Result, RoleGroupReconciler, reconcile_in_order,
};
use crate::{
    client::Client,
    crd::{APP_NAME, CONTROLLER_NAME, OPERATOR_NAME, ZookeeperCluster, ZookeeperRole},
    kvp::{Labels, role_labels},
    resources::{boxed, pdb::PdbBuilder},
};

/// Reconciles the server role of a cluster.
///
/// The role-wide PodDisruptionBudget comes first (if the role declares one), followed by the
/// role groups in name order. The first role group that fails or is not ready yet ends the pass.
pub struct RoleReconciler<'a, C> {
    cluster: &'a ZookeeperCluster,
    client: &'a C,
    labels: Labels,
}

impl<'a, C: Client> RoleReconciler<'a, C> {
    pub fn new(cluster: &'a ZookeeperCluster, client: &'a C) -> Self {
        Self {
            cluster,
            client,
            labels: role_labels(
                cluster,
                APP_NAME,
                ZookeeperRole::Server.into(),
                OPERATOR_NAME,
                CONTROLLER_NAME,
            ),
        }
    }

    pub async fn reconcile_role(&self) -> Result {
        let role_pdb = self
            .cluster
            .spec
            .server
            .pod_disruption_budget()
            .is_some()
            .then(|| boxed(self.client, PdbBuilder::for_role(self.cluster, &self.labels)));

        self.reconcile_role_with(role_pdb).await
    }

    /// Reconciles `role_pdb` (if any) and then every role group. No role group is touched
    /// while `role_pdb` is not done.
    async fn reconcile_role_with(
        &self,
        role_pdb: Option<Box<dyn ResourceReconciler + '_>>,
    ) -> Result {
        if let Some(role_pdb) = role_pdb {
            let outcome = reconcile_in_order(&[role_pdb]).await?;
            if !outcome.is_done() {
                info!(?outcome, "role PodDisruptionBudget is not ready, skipping role groups");
                return Ok(outcome);
            }
        }

        for (role_group_name, role_group) in &self.cluster.spec.server.role_groups {
            let reconciler = RoleGroupReconciler::new(
                self.cluster,
                self.client,
                role_group_name,
                role_group,
                &self.labels,
            );
            let outcome = reconciler.reconcile_group().await?;
            if !outcome.is_done() {
                info!(
                    role_group = %role_group_name,
                    ?outcome,
                    "role group is not ready, skipping remaining role groups"
                );
                return Ok(outcome);
            }
            debug!(role_group = %role_group_name, "role group reconciled");
        }

        Ok(ReconcileOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::{
        client::fake::FakeClient,
        reconcile::{
            DEFAULT_REQUEUE_DELAY, Error,
            tests::{Scripted, requeue},
        },
        resources::tests::cluster,
    };

    fn ready(client: FakeClient, name: &str, replicas: u16) -> FakeClient {
        client.with_status(
            "StatefulSet",
            name,
            json!({"replicas": replicas, "readyReplicas": replicas}),
        )
    }

    #[tokio::test]
    async fn role_pdb_then_role_groups() {
        let cluster = cluster();
        let client = ready(
            ready(FakeClient::default(), "simple-zk-server-analytics", 2),
            "simple-zk-server-default",
            3,
        );

        let outcome = RoleReconciler::new(&cluster, &client)
            .reconcile_role()
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Done);
        let applied = client.applied();
        assert_eq!(applied[0], (
            "PodDisruptionBudget".to_owned(),
            "simple-zk-server".to_owned()
        ));
        // 1 role PDB plus 6 objects for each role group
        assert_eq!(applied.len(), 13);
        assert_eq!(applied[6].1, "simple-zk-server-analytics-headless");
        assert_eq!(applied[12].1, "simple-zk-server-default-headless");
    }

    #[tokio::test]
    async fn pending_role_group_skips_later_role_groups() {
        let cluster = cluster();
        let client = FakeClient::default();

        let outcome = RoleReconciler::new(&cluster, &client)
            .reconcile_role()
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Requeue(DEFAULT_REQUEUE_DELAY));
        assert!(
            client
                .applied_names()
                .iter()
                .all(|name| !name.starts_with("simple-zk-server-default"))
        );
    }

    #[tokio::test]
    async fn failing_role_group_skips_later_role_groups() {
        let cluster = cluster();
        let client =
            FakeClient::default().failing_on("ServiceAccount", "simple-zk-server-analytics");

        let error = RoleReconciler::new(&cluster, &client)
            .reconcile_role()
            .await
            .unwrap_err();

        assert!(matches!(error, Error::ApplyResource {
            kind: "ServiceAccount",
            ..
        }));
        assert_eq!(client.applied_names(), [
            "simple-zk-server",
            "simple-zk-server-analytics"
        ]);
    }

    #[tokio::test]
    async fn failing_role_pdb_skips_role_groups() {
        let cluster = cluster();
        let client = FakeClient::default().failing_on("PodDisruptionBudget", "simple-zk-server");

        let error = RoleReconciler::new(&cluster, &client)
            .reconcile_role()
            .await
            .unwrap_err();

        assert!(matches!(error, Error::ApplyResource {
            kind: "PodDisruptionBudget",
            ..
        }));
        assert_eq!(client.applied_names(), ["simple-zk-server"]);
    }

    #[tokio::test]
    async fn pending_role_pdb_skips_role_groups() {
        let cluster = cluster();
        let client = FakeClient::default();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let role_pdb = Scripted::new("PodDisruptionBudget/simple-zk-server", requeue, &calls);

        let outcome = RoleReconciler::new(&cluster, &client)
            .reconcile_role_with(Some(Box::new(role_pdb)))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Requeue(Duration::from_secs(7)));
        assert_eq!(*calls.lock().unwrap(), ["PodDisruptionBudget/simple-zk-server"]);
        assert!(client.applied().is_empty());
    }

    #[tokio::test]
    async fn no_role_pdb_without_policy() {
        let mut cluster = cluster();
        cluster.spec.server.config = None;
        cluster.spec.server.role_groups.remove("analytics");
        let client = ready(FakeClient::default(), "simple-zk-server-default", 3);

        let outcome = RoleReconciler::new(&cluster, &client)
            .reconcile_role()
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Done);
        assert_eq!(client.applied_names()[0], "simple-zk-server-default");
        assert!(
            !client
                .applied()
                .iter()
                .any(|(kind, _)| kind == "PodDisruptionBudget")
        );
    }

    #[tokio::test]
    async fn no_role_groups() {
        let mut cluster = cluster();
        cluster.spec.server.role_groups.clear();
        let client = FakeClient::default();
        let reconciler = RoleReconciler::new(&cluster, &client);

        let outcome = reconciler.reconcile_role().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Done);
        assert_eq!(client.applied_names(), ["simple-zk-server"]);
        assert_eq!(
            reconciler.labels["app.kubernetes.io/managed-by"],
            "zookeeper.stackable.tech_zookeepercluster"
        );
    }
}
