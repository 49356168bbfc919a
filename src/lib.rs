//! PhaseLink Firmware Library
//!
//! This library provides the core functionality for a two-node half-duplex
//! link controller running on STM32G474 boards. Two boards share a UART link
//! and take turns: one transmits while the other listens, then they swap.
//! An operator button forces each board back to its configured phase.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │  Phase Manager  │  Consumer  │  Trigger forwarding           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      LINK LAYER                              │
//! │  Line Framer  │  Message Queue  │  Line Protocol             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  USART  │  GPIO (LEDs)  │  EXTI (sync button)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │   embassy-rs (interrupt executors + thread executor)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Immutable-by-default**: State transitions return new instances
//! - **Type-driven design**: Custom types enforce invariants at compile time
//! - **No unsafe in application code**: All unsafe isolated in the binary's
//!   executor glue
//! - **Functional core, imperative shell**: Pure logic separated from I/O
//! - **Best-effort delivery**: Full queues and long lines drop data, never block

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Board bring-up for the link UART, indicator LEDs and sync button.
#[cfg(feature = "embedded")]
pub mod hal;

/// Inbound Link Path
///
/// Line framing and the bounded queue feeding the consumer.
pub mod link;

/// Phase Synchronisation
///
/// TX/RX state machine, hard-sync trigger and consumer.
pub mod sync;

/// Line Protocol
///
/// Terminator rules and outbound line formatting.
pub mod protocol;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::link::framer::LineFramer;
    pub use crate::link::queue::MessageQueue;
    pub use crate::sync::consumer::Consumer;
    pub use crate::sync::manager::{LinkHardware, PhaseManager};
    pub use crate::sync::phase::SharedPhase;
    pub use crate::sync::trigger::TriggerEvent;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
