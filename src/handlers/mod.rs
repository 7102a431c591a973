//! HTTP handlers for the project API.

pub mod project;
pub use project::*;
