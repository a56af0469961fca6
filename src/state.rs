use crate::backend::FileBackend;
use crate::store::DocumentStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<DocumentStore<FileBackend>>>,
}

impl AppState {
    pub fn new(store: DocumentStore<FileBackend>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}
