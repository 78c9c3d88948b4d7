//! Builders for the Kubernetes objects owned by a `ZookeeperCluster`.

pub mod meta;
pub mod pdb;
