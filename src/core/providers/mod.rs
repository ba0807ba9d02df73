//! Provider clients and wire-format translation

pub mod client;
pub mod local;
pub mod wire;

pub use client::{ProviderClient, ProviderUsage};
pub use local::{HttpLocalBackend, LocalCompletion, StubLocalBackend};
