//! Inbound Link Path
//!
//! Bytes from the link UART are framed into lines in interrupt-priority
//! context and handed to the consumer through a bounded queue.
//! Delivery is best-effort: overflowing lines are truncated and lines
//! offered to a full queue are dropped.

pub mod framer;
pub mod queue;
