use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Affinity;

/// A type that can be merged with itself
///
/// This is implemented for configuration values that come from several scopes (role group and
/// role), where the tighter scope takes precedence.
///
/// # Example
///
/// ```
/// # use stackable_zookeeper_operator::config::merge::Merge;
/// #[derive(Debug, PartialEq, Eq)]
/// struct Foo {
///     bar: Option<u8>,
///     baz: Option<u8>,
/// }
///
/// impl Merge for Foo {
///     fn merge(&mut self, defaults: &Self) {
///         self.bar.merge(&defaults.bar);
///         self.baz.merge(&defaults.baz);
///     }
/// }
///
/// let mut config = Foo {
///     bar: Some(0),
///     baz: None,
/// };
/// config.merge(&Foo {
///     bar: Some(1),
///     baz: Some(2),
/// });
/// assert_eq!(config, Foo {
///     bar: Some(0), // Overridden by `bar: Some(0)` above
///     baz: Some(2), // Fallback is used
/// });
/// ```
///
/// # Options
///
/// A field should be [`Option`]al if it is [`Atomic`] (for example: [`u16`]). An explicitly set
/// value (including `Some(0)`) is never replaced by a default.
pub trait Merge {
    /// Merge with `defaults`, preferring values from `self` if they are set there
    fn merge(&mut self, defaults: &Self);
}

impl<T: Merge> Merge for Box<T> {
    fn merge(&mut self, defaults: &Self) {
        T::merge(self, defaults)
    }
}

/// Moving version of [`Merge::merge`], to produce slightly nicer test output
pub fn merge<T: Merge>(mut overrides: T, defaults: &T) -> T {
    overrides.merge(defaults);
    overrides
}

/// Merges an optional composite block.
///
/// An unset block inherits the defaults wholesale. When both sides are set, the blocks are
/// merged field by field. Unlike `Option<T: Atomic>`, the override never replaces the defaults
/// as a single value.
pub fn merge_block<T: Merge + Clone>(this: &mut Option<T>, defaults: &Option<T>) {
    match (this.as_mut(), defaults) {
        (Some(this), Some(defaults)) => this.merge(defaults),
        (None, Some(defaults)) => *this = Some(defaults.clone()),
        (_, None) => {}
    }
}

/// A marker trait for types that are merged atomically (as one single value) rather than
/// trying to merge each field individually
pub trait Atomic: Clone {}
impl Atomic for u8 {}
impl Atomic for u16 {}
impl Atomic for u32 {}
impl Atomic for bool {}
impl Atomic for String {}
impl Atomic for Affinity {}
impl<T: Clone> Atomic for Vec<T> {}
impl<K: Clone, V: Clone> Atomic for BTreeMap<K, V> {}

impl<T: Atomic> Merge for Option<T> {
    fn merge(&mut self, defaults: &Self) {
        if self.is_none() {
            *self = defaults.clone();
        }
    }
}
