use k8s_openapi::api::core::v1::ServiceAccount;

use super::{ResourceBuilder, Result, SharedContext};

/// The identity the pods of a role group run as.
pub struct ServiceAccountBuilder<'a> {
    context: SharedContext<'a>,
}

impl<'a> ServiceAccountBuilder<'a> {
    pub fn new(context: SharedContext<'a>) -> Self {
        Self { context }
    }
}

impl ResourceBuilder for ServiceAccountBuilder<'_> {
    type Resource = ServiceAccount;

    fn name(&self) -> String {
        self.context.object_name()
    }

    fn build(&self) -> Result<Option<ServiceAccount>> {
        Ok(Some(ServiceAccount {
            metadata: self.context.object_meta(self.name())?,
            ..Default::default()
        }))
    }
}
