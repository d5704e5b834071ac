pub mod capabilities;
pub mod executor;
pub mod factory;
