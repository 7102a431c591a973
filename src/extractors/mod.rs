//! Request extractors: bearer token and validated JSON body.

mod auth;
mod validated;

pub use auth::BearerToken;
pub use validated::{report_to_errors, ValidatedJson};
