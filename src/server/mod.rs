// Server layer: HTTP routes over the store and subscriber hub

pub mod routes;

pub use routes::{build_router, AppState};
