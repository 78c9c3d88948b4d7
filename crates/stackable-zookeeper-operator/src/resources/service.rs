use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};

use super::{ResourceBuilder, Result, SharedContext};
use crate::crd::{
    CLIENT_PORT, CLIENT_PORT_NAME, ELECTION_PORT, ELECTION_PORT_NAME, FOLLOWER_PORT,
    FOLLOWER_PORT_NAME,
};

/// The headless Service that gives every server of a role group a stable DNS name.
pub struct HeadlessServiceBuilder<'a> {
    context: SharedContext<'a>,
}

impl<'a> HeadlessServiceBuilder<'a> {
    pub fn new(context: SharedContext<'a>) -> Self {
        Self { context }
    }
}

impl ResourceBuilder for HeadlessServiceBuilder<'_> {
    type Resource = Service;

    fn name(&self) -> String {
        self.context.rolegroup_ref.headless_service_name()
    }

    fn build(&self) -> Result<Option<Service>> {
        let port = |name: &str, port: u16| ServicePort {
            name: Some(name.to_owned()),
            port: i32::from(port),
            protocol: Some("TCP".to_owned()),
            ..Default::default()
        };

        Ok(Some(Service {
            metadata: self.context.object_meta(self.name())?,
            spec: Some(ServiceSpec {
                cluster_ip: Some("None".to_owned()),
                // servers have to find each other before any of them is ready
                publish_not_ready_addresses: Some(true),
                selector: Some(self.context.labels.clone()),
                ports: Some(vec![
                    port(CLIENT_PORT_NAME, CLIENT_PORT),
                    port(FOLLOWER_PORT_NAME, FOLLOWER_PORT),
                    port(ELECTION_PORT_NAME, ELECTION_PORT),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }
}
