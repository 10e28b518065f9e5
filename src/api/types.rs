//! Shared types for the demo API layer.

use std::sync::Arc;

use crate::controller::SosController;

/// Shared context for all API routes: the single controller instance
/// both views act on.
#[derive(Clone)]
pub struct ApiContext {
    pub controller: Arc<SosController>,
}

impl ApiContext {
    pub fn new(controller: Arc<SosController>) -> Self {
        Self { controller }
    }
}
