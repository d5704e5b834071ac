pub mod capability;
pub mod predicate;
pub mod renderer;

pub use capability::*;
pub use predicate::*;
pub use renderer::*;
