//! Reconciliation of the server role of ZooKeeper clusters.
//!
//! A `ZookeeperCluster` declares role-wide defaults and a set of role groups that override them.
//! [`role_utils::merge_role_group_config`] resolves the effective spec of every role group and
//! [`reconcile::RoleReconciler`] drives the child objects of the role towards that spec, one role
//! group after the other.

pub mod builder;
pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod kvp;
pub mod logging;
pub mod reconcile;
pub mod resources;
pub mod role_utils;

// External re-exports
pub use k8s_openapi;
pub use kube;
