//! Label sets attached to the objects of the server role and its role groups.
//!
//! Labels are plain `BTreeMap<String, String>`s, as used by [`ObjectMeta`]. Every function in
//! here builds a new map and never touches its inputs.
//!
//! [`ObjectMeta`]: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta

mod consts;
mod label;

pub use consts::*;
pub use label::*;
