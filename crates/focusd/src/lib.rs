//! focusd - schedule-driven app restriction service
//!
//! The binary in `main.rs` handles process concerns (arguments, logging,
//! signals, the IPC socket). [`Service`] holds everything a client request
//! or an engine event can touch, so it can be driven directly in tests.

mod service;

pub use service::*;
