//! HTTP transport shared by the EWS gateway.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
