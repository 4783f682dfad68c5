//! Marine Server library
//!
//! Exposes the REST surface, configuration and shared state so the API can
//! be exercised in-process.

pub mod api;
pub mod config;
pub mod reload;
pub mod state;
