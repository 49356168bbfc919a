//! Phase Synchronisation
//!
//! The TX/RX alternation state machine, the operator trigger that overrides
//! it, and the consumer that only surfaces inbound lines while listening.
//! Everything here is written against `embedded-hal` / `embedded-io-async`
//! traits so it runs unchanged on the target and in host tests.

pub mod consumer;
pub mod indicators;
pub mod manager;
pub mod phase;
pub mod trigger;
