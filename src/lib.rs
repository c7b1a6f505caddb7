//! omnibus - one chat endpoint, several LLM vendors
//!
//! This library provides the core functionality for the omnibus proxy:
//! configuration, the per-vendor call adapters, the fan-out aggregator,
//! and the OpenAI-compatible HTTP surface.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod provider;
pub mod proxy;

pub use aggregate::Aggregator;
pub use config::Config;
pub use error::{Error, Result};
