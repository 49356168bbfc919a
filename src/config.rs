//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the PhaseLink controller.
//! Line framing limits, queue depth, phase timing, pin mappings and executor
//! priorities are centralized here.

use crate::types::{ConfigError, RoleConfig};

/// Message slot size in bytes, including the terminator slot
pub const MSG_SIZE: usize = 64;

/// Maximum payload bytes in a framed line (one slot is reserved for the terminator)
pub const MAX_LINE_LEN: usize = MSG_SIZE - 1;

/// Depth of the inbound message queue
pub const MSG_QUEUE_DEPTH: usize = 10;

/// Duration of one TX or RX phase in milliseconds
pub const PHASE_PERIOD_MS: u32 = 5_000;

/// Link UART baud rate
pub const LINK_BAUD_RATE: u32 = 115_200;

/// Link UART receive ring buffer size
pub const LINK_RX_BUFFER_SIZE: usize = 256;

/// Link UART transmit ring buffer size
pub const LINK_TX_BUFFER_SIZE: usize = 64;

/// Bytes pulled from the UART per read in the framer task
pub const LINK_READ_CHUNK: usize = 16;

/// Pause after a failed link read before reading again
pub const LINK_ERROR_BACKOFF_MS: u32 = 1;

/// Board identity selected at build time through `PHASELINK_BOARD_ID`
pub const BOARD_ID: u8 = parse_board_id(env!("PHASELINK_BOARD_ID"));

const fn parse_board_id(raw: &str) -> u8 {
    match raw.as_bytes() {
        [b'2'] => 2,
        [b'1'] => 1,
        // build.rs rejects anything else; keep the value invalid so startup fails loudly
        _ => 0,
    }
}

/// Executor priority assignments
pub mod priorities {
    //! Interrupt priorities for the multi-priority executors.
    //!
    //! Lower number preempts higher number. The thread-mode executor running
    //! the consumer sits below both.

    /// Link receive path (line framer)
    pub const LINK_RX: u8 = 6;

    /// Phase manager and trigger forwarding
    pub const PHASE: u8 = 7;
}

/// Resolve the build-time board identity into a role
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBoardId`] when the build was configured with
/// an unknown board id.
pub const fn board_role() -> Result<RoleConfig, ConfigError> {
    RoleConfig::from_board_id(BOARD_ID)
}
