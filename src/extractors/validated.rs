//! JSON body that must deserialize and pass its `garde` rules before reaching a handler.

use crate::error::{AppError, FieldErrors};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use garde::Validate;
use serde::de::DeserializeOwned;

pub struct ValidatedJson<T>(pub T);

/// `task_name` -> `taskName`, per path segment.
fn camel_case(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut upper = false;
    for c in path.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn report_to_errors(report: &garde::Report) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (path, error) in report.iter() {
        let field = match path.to_string() {
            s if s.is_empty() => "body".to_string(),
            s => camel_case(&s),
        };
        errors.entry(field).or_default().push(error.message().to_string());
    }
    errors
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    T::Context: Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation("body", rejection.body_text()))?;
        value
            .validate()
            .map_err(|report| AppError::Validation(report_to_errors(&report)))?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_paths_use_wire_names() {
        assert_eq!(camel_case("list_user_asign"), "listUserAsign");
        assert_eq!(camel_case("items[0].user_id"), "items[0].userId");
        assert_eq!(camel_case("id"), "id");
    }
}
