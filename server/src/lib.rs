//! # Server
//!
//! The HTTP boundary of the CADRAG engine: query and rebuild endpoints,
//! index statistics, and CRUD for user-contributed command codes. All
//! retrieval state lives in [`cadrag_retrieval::RebuildCoordinator`]; this
//! crate only translates between HTTP and the retrieval core.

pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod store;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use routes::router;
pub use service::{RetrievalService, SearchOutcome, ServiceStats};
pub use store::{UserCodeRecord, UserCodeStore};
