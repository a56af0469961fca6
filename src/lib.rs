pub mod app;
pub mod backend;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod store;
pub mod views;

pub use app::router;
pub use backend::{FileBackend, KeyValueStore, MemoryBackend};
pub use config::Config;
pub use state::AppState;
pub use store::{DocumentStore, STORAGE_KEY};
