use std::collections::BTreeMap;

use kube::{Resource, ResourceExt};

use crate::{
    crd::RoleGroupSpec,
    kvp::consts::{
        K8S_APP_COMPONENT_KEY, K8S_APP_INSTANCE_KEY, K8S_APP_MANAGED_BY_KEY, K8S_APP_NAME_KEY,
        K8S_APP_PART_OF_KEY,
    },
};

pub type Labels = BTreeMap<String, String>;

/// Formats the value of the `app.kubernetes.io/managed-by` label, e.g.
/// `zookeeper.stackable.tech_zookeepercluster`.
pub fn format_full_controller_name(operator_name: &str, controller_name: &str) -> String {
    format!("{operator_name}_{controller_name}")
}

/// Labels shared by every object of a role.
pub fn role_labels<T: Resource>(
    owner: &T,
    app_name: &str,
    role: &str,
    operator_name: &str,
    controller_name: &str,
) -> Labels {
    let mut labels = role_selector_labels(owner, app_name, role);
    labels.insert(K8S_APP_INSTANCE_KEY.to_owned(), owner.name_any());
    labels.insert(
        K8S_APP_MANAGED_BY_KEY.to_owned(),
        format_full_controller_name(operator_name, controller_name),
    );
    labels
}

/// The subset of [`role_labels`] that every pod of the role still carries after the role group
/// labels were merged in, suitable for selecting all pods of a role.
pub fn role_selector_labels<T: Resource>(owner: &T, app_name: &str, role: &str) -> Labels {
    BTreeMap::from([
        (K8S_APP_NAME_KEY.to_owned(), app_name.to_owned()),
        (K8S_APP_PART_OF_KEY.to_owned(), owner.name_any()),
        (K8S_APP_COMPONENT_KEY.to_owned(), role.to_owned()),
    ])
}

/// Builds the label set of a role group.
///
/// Starts with the `role_labels`, overlays the node selector of the effective role group spec
/// and finally sets [`K8S_APP_INSTANCE_KEY`] to the lower-cased `role_group_name`. The identity
/// label always wins, whatever the other two sources contain for that key.
pub fn merge_labels(
    role_labels: &Labels,
    role_group: &RoleGroupSpec,
    role_group_name: &str,
) -> Labels {
    let mut labels = role_labels.clone();
    if let Some(node_selector) = role_group.node_selector() {
        labels.extend(
            node_selector
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
    }
    labels.insert(
        K8S_APP_INSTANCE_KEY.to_owned(),
        role_group_name.to_lowercase(),
    );
    labels
}
