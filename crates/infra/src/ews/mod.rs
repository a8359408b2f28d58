//! Exchange Web Services gateway

pub mod account;
pub mod auth;
pub mod client;
pub mod folders;
pub mod parser;
pub mod soap;
pub mod strategy;
pub mod timezone;

pub use account::ServiceAccount;
pub use auth::{EwsAuth, StaticTokenProvider, TokenProvider};
pub use client::EwsClient;
pub use strategy::ImpersonationStrategy;
