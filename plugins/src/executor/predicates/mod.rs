//! Additional conflict predicates for the dependency inferencer.

mod exclusive;
mod path;

pub use exclusive::ExclusiveCapabilityPredicate;
pub use path::PathPrefixPredicate;
