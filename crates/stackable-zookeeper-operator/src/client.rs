use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    Api, Resource,
    api::{Patch, PatchParams},
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::trace;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("object is missing key {key:?}"))]
    MissingObjectKey { key: &'static str },

    #[snafu(display("failed to apply {kind} {name:?}"))]
    ApplyPatch {
        source: kube::Error,
        kind: String,
        name: String,
    },
}

/// The bounds of every object written through a [`Client`].
pub trait ClientObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ClientObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Write access to the Kubernetes objects owned by a cluster.
#[async_trait]
pub trait Client: Send + Sync {
    /// Creates or updates `resource` using server-side apply and returns the object as stored by
    /// the API server, including its status.
    async fn apply_patch<K: ClientObject>(&self, resource: &K) -> Result<K>;
}

/// A [`Client`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    apply_patch_params: PatchParams,
}

impl KubeClient {
    /// `field_manager` identifies this operator as the owner of the applied fields, e.g.
    /// `zookeeper.stackable.tech_zookeepercluster`.
    pub fn new(client: kube::Client, field_manager: &str) -> Self {
        Self {
            client,
            apply_patch_params: PatchParams::apply(field_manager).force(),
        }
    }
}

#[async_trait]
impl Client for KubeClient {
    async fn apply_patch<K: ClientObject>(&self, resource: &K) -> Result<K> {
        let meta = resource.meta();
        let name = meta.name.as_deref().context(MissingObjectKeySnafu { key: "name" })?;
        let namespace = meta
            .namespace
            .as_deref()
            .context(MissingObjectKeySnafu { key: "namespace" })?;
        trace!(kind = %K::kind(&()), name, namespace, "applying object");

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &self.apply_patch_params, &Patch::Apply(resource))
            .await
            .with_context(|_| ApplyPatchSnafu {
                kind: K::kind(&()).to_string(),
                name: name.to_owned(),
            })
    }
}
