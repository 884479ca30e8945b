//! Gateway facade: routing, retry and fallback around a pluggable transport.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod error_classification;
mod execution;
mod fallback;
pub mod policy;
pub mod stream;

pub use builder::GatewayBuilder;
pub use core::{CallStats, Gateway, GatewayOutput};
pub use error_classification::classify;
pub use policy::RetryPolicy;
pub use stream::{CancelHandle, ChatStream};
