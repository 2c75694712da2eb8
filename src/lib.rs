pub mod app;
pub mod coerce;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::{load_data, persist_data};
