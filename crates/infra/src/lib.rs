//! # RoomSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The Exchange Web Services gateway (SOAP over HTTP)
//! - JSON file persistence for mailbox stores
//! - Configuration loading (environment and files)
//! - Logging setup
//!
//! ## Architecture
//! - Implements traits defined in `roomsync-core`
//! - Contains all "impure" code (network and disk I/O)

pub mod config;
pub mod errors;
pub mod ews;
pub mod http;
pub mod observability;
pub mod persistence;

// Re-export commonly used items
pub use errors::InfraError;
pub use ews::{EwsAuth, EwsClient, ImpersonationStrategy, ServiceAccount, StaticTokenProvider, TokenProvider};
pub use http::*;
pub use observability::init_tracing;
pub use persistence::JsonFileStoreRepository;
