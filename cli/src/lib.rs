//! taskweave-cli library - exposes command modules for unit tests

pub mod app;
pub mod commands;
