use k8s_openapi::{
    api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec},
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, ObjectMeta},
        util::intstr::IntOrString,
    },
};

use crate::{crd::PodDisruptionBudgetSpec as PdbConfig, kvp::Labels};

/// The disruption budget used if a policy sets neither `maxUnavailable` nor `minAvailable`.
pub const DEFAULT_MAX_UNAVAILABLE: u16 = 1;

/// This builder is used to construct [`PodDisruptionBudget`]s.
///
/// The following attributes on a [`PodDisruptionBudget`] are considered mandatory and must be specified
/// before being able to construct the [`PodDisruptionBudget`]:
///
/// 1. [`PodDisruptionBudget::metadata`]
/// 2. [`PodDisruptionBudgetSpec::selector`]
/// 3. Either [`PodDisruptionBudgetSpec::min_available`] or [`PodDisruptionBudgetSpec::max_unavailable`]
#[derive(Debug, Default)]
pub struct PodDisruptionBudgetBuilder<ObjectMeta, LabelSelector, PodDisruptionBudgetConstraint> {
    metadata: ObjectMeta,
    selector: LabelSelector,
    constraint: PodDisruptionBudgetConstraint,
}

/// Only fixed numbers are supported, no percentages.
/// We use u16, as [`IntOrString`] takes an i32 and we don't want to allow negative numbers. u16 will always fit in i32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodDisruptionBudgetConstraint {
    MaxUnavailable(u16),
    MinAvailable(u16),
}

impl PodDisruptionBudgetConstraint {
    /// The constraint requested by a disruption budget policy, or [`None`] if the policy is
    /// disabled. `maxUnavailable` takes precedence over `minAvailable`.
    pub fn from_config(config: &PdbConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(match (config.max_unavailable, config.min_available) {
            (Some(max_unavailable), _) => Self::MaxUnavailable(max_unavailable),
            (None, Some(min_available)) => Self::MinAvailable(min_available),
            (None, None) => Self::MaxUnavailable(DEFAULT_MAX_UNAVAILABLE),
        })
    }
}

impl PodDisruptionBudgetBuilder<(), (), ()> {
    pub fn new() -> Self {
        PodDisruptionBudgetBuilder::default()
    }

    /// Sets the mandatory [`PodDisruptionBudget::metadata`].
    pub fn new_with_metadata(
        self,
        metadata: impl Into<ObjectMeta>,
    ) -> PodDisruptionBudgetBuilder<ObjectMeta, (), ()> {
        PodDisruptionBudgetBuilder {
            metadata: metadata.into(),
            selector: (),
            constraint: (),
        }
    }
}

impl PodDisruptionBudgetBuilder<ObjectMeta, (), ()> {
    /// Sets the mandatory [`PodDisruptionBudgetSpec::selector`] to match all of `labels`.
    pub fn with_selector_labels(
        self,
        labels: Labels,
    ) -> PodDisruptionBudgetBuilder<ObjectMeta, LabelSelector, ()> {
        PodDisruptionBudgetBuilder {
            metadata: self.metadata,
            selector: LabelSelector {
                match_expressions: None,
                match_labels: Some(labels),
            },
            constraint: (),
        }
    }
}

impl PodDisruptionBudgetBuilder<ObjectMeta, LabelSelector, ()> {
    /// Sets either [`PodDisruptionBudgetSpec::max_unavailable`] or
    /// [`PodDisruptionBudgetSpec::min_available`].
    pub fn with_constraint(
        self,
        constraint: PodDisruptionBudgetConstraint,
    ) -> PodDisruptionBudgetBuilder<ObjectMeta, LabelSelector, PodDisruptionBudgetConstraint> {
        PodDisruptionBudgetBuilder {
            metadata: self.metadata,
            selector: self.selector,
            constraint,
        }
    }
}

impl PodDisruptionBudgetBuilder<ObjectMeta, LabelSelector, PodDisruptionBudgetConstraint> {
    /// This function can be called after [`PodDisruptionBudget::metadata`], [`PodDisruptionBudgetSpec::selector`]
    /// and either [`PodDisruptionBudgetSpec::min_available`] or [`PodDisruptionBudgetSpec::max_unavailable`] are set.
    pub fn build(self) -> PodDisruptionBudget {
        let (max_unavailable, min_available) = match self.constraint {
            PodDisruptionBudgetConstraint::MaxUnavailable(max_unavailable) => {
                (Some(max_unavailable), None)
            }
            PodDisruptionBudgetConstraint::MinAvailable(min_available) => {
                (None, Some(min_available))
            }
        };
        PodDisruptionBudget {
            metadata: self.metadata,
            spec: Some(PodDisruptionBudgetSpec {
                max_unavailable: max_unavailable.map(i32::from).map(IntOrString::Int),
                min_available: min_available.map(i32::from).map(IntOrString::Int),
                selector: Some(self.selector),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
