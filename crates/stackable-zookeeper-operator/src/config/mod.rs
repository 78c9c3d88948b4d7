//! Layered configuration for ZooKeeper server role groups.
//!
//! A role group only ever sees two layers: its own (partial) [`RoleGroupSpec`] and the
//! [`ServerSpec`] of the role it belongs to. Everything set on the role group wins, everything
//! left unset falls back to the role. The `config` block is merged one level deeper, field by
//! field, so a role group can override a single tuning value without restating the whole block.
//!
//! The merge is spelled out field by field via [`Merge`](merge::Merge) implementations on the
//! CRD types, see [`crate::crd`].
//!
//! [`RoleGroupSpec`]: crate::crd::RoleGroupSpec
//! [`ServerSpec`]: crate::crd::ServerSpec

pub mod merge;
