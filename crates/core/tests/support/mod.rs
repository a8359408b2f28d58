//! Shared test helpers for `roomsync-core` integration tests.
//!
//! Fixtures for building items and windows, plus in-memory mocks for every
//! calendar port so service tests can focus on behaviour.

#![allow(dead_code)]

pub mod fixtures;
pub mod gateway;
pub mod repositories;
