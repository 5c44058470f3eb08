//! Chorus Fan-out Dispatch Layer
//!
//! Concurrent multi-provider request execution: one task per requested
//! provider, per-provider circuit breaking, streaming partial-result capture,
//! and partial-failure recovery.
//!
//! # Architecture
//!
//! - [`HealthTracker`]: per-provider circuit-breaker state
//! - [`FanoutDispatcher`]: runs a prompt against N providers concurrently and
//!   joins into a single settlement
//! - [`AbortRegistry`]: per-session cancellation tokens so an external abort
//!   cancels every in-flight provider task atomically
//!
//! The dispatcher's recovery policy is deliberate: a provider that errors
//! after streaming partial text settles as completed-with-soft-error with the
//! partial text preserved, because partial answers are better than none for a
//! synthesis pipeline.

#![warn(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod health;
pub mod registry;

pub use config::{DispatchConfig, HealthConfig};
pub use dispatcher::{FanoutDispatcher, FanoutRequest};
pub use error::DispatchError;
pub use events::{DispatchEvent, FanoutSettlement, ProviderOutcome, ProviderStatus};
pub use health::{AttemptDecision, HealthTracker};
pub use registry::AbortRegistry;
