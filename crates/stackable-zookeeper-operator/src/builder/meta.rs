use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use snafu::{OptionExt, Snafu};

use crate::kvp::Labels;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("object is missing key {key:?} to build an owner reference"))]
    MissingOwnerKey { key: &'static str },
}

/// A builder to build [`ObjectMeta`] objects.
///
/// Note: This builder only supports a single `OwnerReference`.
#[derive(Clone, Debug, Default)]
pub struct ObjectMetaBuilder {
    name: Option<String>,
    namespace: Option<String>,
    ownerreference: Option<OwnerReference>,
    labels: Option<Labels>,
}

impl ObjectMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the namespace of `owner` and makes `owner` the controlling owner of the object, so
    /// that the object is garbage collected together with `owner`.
    pub fn owned_by<T: Resource<DynamicType = ()>>(&mut self, owner: &T) -> Result<&mut Self> {
        let ownerreference = owner
            .controller_owner_ref(&())
            .with_context(|| MissingOwnerKeySnafu {
                key: if owner.meta().name.is_none() {
                    "name"
                } else {
                    "uid"
                },
            })?;
        self.namespace = owner.namespace();
        self.ownerreference = Some(ownerreference);
        Ok(self)
    }

    /// This adds multiple labels to the existing labels.
    /// Any existing label with a key that is contained in `labels` will be overwritten
    pub fn with_labels(&mut self, labels: Labels) -> &mut Self {
        self.labels.get_or_insert_with(Labels::new).extend(labels);
        self
    }

    pub fn build(&self) -> ObjectMeta {
        ObjectMeta {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            owner_references: self
                .ownerreference
                .as_ref()
                .map(|ownerreference| vec![ownerreference.clone()]),
            labels: self.labels.clone(),
            ..ObjectMeta::default()
        }
    }
}
