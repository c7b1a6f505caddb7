//! Upstream provider adapters.
//!
//! Each configured provider is a [`ProviderSpec`] tagged with a [`Vendor`]
//! dialect. Calling it always yields a [`ProviderResult`]; failures are
//! carried as values so one provider can never unwind its siblings.

mod adapter;
mod vendor;

pub use adapter::{CallError, ProviderResult, ProviderSpec};
pub use vendor::Vendor;
