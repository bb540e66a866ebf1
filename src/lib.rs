pub mod cache;
pub mod core;
pub mod extract;
pub mod features;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod store;

// --- Primary core exports ---
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::{ApiError, AppState};

// --- Convenience module paths ---
pub use features::{bangs, instant, knowledge, suggest};
pub use search::engines;
