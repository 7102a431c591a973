//! Shared application state for all routes.

use crate::service::ProjectService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ProjectService>,
}

impl AppState {
    pub fn new(service: impl ProjectService + 'static) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}
