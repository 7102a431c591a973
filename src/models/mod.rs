//! Project/task entities and API payloads.

mod entities;
mod requests;

pub use entities::*;
pub use requests::*;
