pub mod predicates;
pub mod renderers;

pub use predicates::{ExclusiveCapabilityPredicate, PathPrefixPredicate};
pub use renderers::{JsonlRendererPlugin, TextRendererPlugin};
