pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod status;
pub mod store;
pub mod types;

pub use cache::EndpointCache;
pub use config::Config;
pub use context::EngineContext;
pub use error::CompileError;
pub use status::StatusBook;
pub use store::{HttpProfileStore, MemoryProfileStore, ProfileStore};
