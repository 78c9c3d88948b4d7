//! The child objects of the server role and its role groups.
//!
//! Every object is described by a [`ResourceBuilder`] and written by a
//! [`SingleResourceReconciler`], which turns the builder into a [`ResourceReconciler`].
use std::{num::TryFromIntError, sync::Arc, time::Duration};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::{
    builder::{self, meta::ObjectMetaBuilder},
    client::{Client, ClientObject},
    crd::{RoleGroupSpec, ZookeeperCluster},
    kvp::Labels,
    reconcile::{
        ApplyResourceSnafu, BuildResourceSnafu, ReconcileOutcome, ResourceReconciler,
        Result as ReconcileResult,
    },
    role_utils::RoleGroupRef,
};

pub mod config_map;
pub mod logging;
pub mod pdb;
pub mod service;
pub mod service_account;
pub mod statefulset;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to build object metadata"))]
    ObjectMeta { source: builder::meta::Error },

    #[snafu(display("object has no namespace"))]
    ObjectHasNoNamespace,

    #[snafu(display("invalid graceful shutdown timeout {value:?}"))]
    InvalidGracefulShutdownTimeout {
        source: humantime::DurationError,
        value: String,
    },

    #[snafu(display("termination grace period is too long (got {duration:?})"))]
    TerminationGracePeriodTooLong {
        source: TryFromIntError,
        duration: Duration,
    },
}

/// Everything the builders of one role group need to know, computed once per reconciliation
/// pass.
#[derive(Debug)]
pub struct RoleGroupContext<'a> {
    pub cluster: &'a ZookeeperCluster,
    pub rolegroup_ref: RoleGroupRef,

    /// The merged spec of the role group.
    pub spec: RoleGroupSpec,

    /// The labels attached to every object of the role group.
    pub labels: Labels,
}

impl RoleGroupContext<'_> {
    pub fn object_name(&self) -> String {
        self.rolegroup_ref.object_name()
    }

    /// Metadata of an object of this role group called `name`, owned by the cluster.
    pub fn object_meta(&self, name: impl Into<String>) -> Result<ObjectMeta> {
        Ok(ObjectMetaBuilder::new()
            .name(name)
            .owned_by(self.cluster)
            .context(ObjectMetaSnafu)?
            .with_labels(self.labels.clone())
            .build())
    }
}

/// Describes a single Kubernetes object.
pub trait ResourceBuilder: Send + Sync {
    type Resource: ClientObject + k8s_openapi::Resource;

    /// The name of the built object.
    fn name(&self) -> String;

    /// Builds the desired state of the object, or [`None`] if the object should not be written.
    fn build(&self) -> Result<Option<Self::Resource>>;

    /// Decides whether the object, as stored by the API server, is ready for the objects that
    /// depend on it.
    fn readiness(&self, _applied: &Self::Resource) -> ReconcileOutcome {
        ReconcileOutcome::Done
    }
}

/// Builds one object, applies it and reports its readiness.
pub struct SingleResourceReconciler<'a, C, B> {
    client: &'a C,
    builder: B,
}

impl<'a, C, B> SingleResourceReconciler<'a, C, B> {
    pub fn new(client: &'a C, builder: B) -> Self {
        Self { client, builder }
    }
}

/// Shorthand to box a [`SingleResourceReconciler`] for the ordered list of a role group.
pub fn boxed<'a, C: Client, B: ResourceBuilder + 'a>(
    client: &'a C,
    builder: B,
) -> Box<dyn ResourceReconciler + 'a> {
    Box::new(SingleResourceReconciler::new(client, builder))
}

#[async_trait]
impl<C: Client, B: ResourceBuilder> ResourceReconciler for SingleResourceReconciler<'_, C, B> {
    fn name(&self) -> String {
        format!(
            "{}/{}",
            <B::Resource as k8s_openapi::Resource>::KIND,
            self.builder.name()
        )
    }

    async fn reconcile(&self) -> ReconcileResult {
        let kind = <B::Resource as k8s_openapi::Resource>::KIND;
        let name = self.builder.name();

        let Some(resource) = self
            .builder
            .build()
            .with_context(|_| BuildResourceSnafu {
                kind,
                name: name.clone(),
            })?
        else {
            debug!(kind, %name, "object is disabled, nothing to apply");
            return Ok(ReconcileOutcome::Done);
        };

        let applied = self
            .client
            .apply_patch(&resource)
            .await
            .with_context(|_| ApplyResourceSnafu {
                kind,
                name: name.clone(),
            })?;
        Ok(self.builder.readiness(&applied))
    }
}

/// Shared handle to the [`RoleGroupContext`] of the builders of one role group.
pub type SharedContext<'a> = Arc<RoleGroupContext<'a>>;
