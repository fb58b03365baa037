use std::sync::Arc;

use crate::backend::VmBackend;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn VmBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn VmBackend>) -> Self {
        Self { backend }
    }
}
