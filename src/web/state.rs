use std::sync::Arc;

use crate::{model::ModelManager, notify::Notifier, utils::uploads::BlobStore};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    notifier: Arc<dyn Notifier>,
    blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(mm: ModelManager, notifier: Arc<dyn Notifier>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            mm,
            notifier,
            blobs,
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }
}
