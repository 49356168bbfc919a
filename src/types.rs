//! Shared types used across the PhaseLink firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

use heapless::Vec;

use crate::config::MAX_LINE_LEN;

/// Link phase of a board
///
/// Exactly one phase is active at any instant. In `Tx` the board drives the
/// outbound stream and its red indicator; in `Rx` it surfaces inbound lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Transmitting
    Tx,
    /// Receiving
    Rx,
}

impl Phase {
    /// The other phase
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Tx => Self::Rx,
            Self::Rx => Self::Tx,
        }
    }

    /// Check if this is the transmit phase
    #[must_use]
    pub const fn is_tx(self) -> bool {
        matches!(self, Self::Tx)
    }

    /// Check if this is the receive phase
    #[must_use]
    pub const fn is_rx(self) -> bool {
        matches!(self, Self::Rx)
    }

    /// Short label used in logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tx => "TX",
            Self::Rx => "RX",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Phase {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Tx => defmt::write!(f, "TX"),
            Self::Rx => defmt::write!(f, "RX"),
        }
    }
}

/// Board role: identity plus the phases that identity implies
///
/// Resolved once at startup. Nothing downstream branches on the board id
/// again; it only reads the phases carried here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleConfig {
    board_id: u8,
    initial_phase: Phase,
    reset_phase: Phase,
}

impl RoleConfig {
    /// Board 1: starts listening and snaps back to RX on hard sync
    pub const BOARD_1: Self = Self {
        board_id: 1,
        initial_phase: Phase::Rx,
        reset_phase: Phase::Rx,
    };

    /// Board 2: starts talking and snaps back to TX on hard sync
    pub const BOARD_2: Self = Self {
        board_id: 2,
        initial_phase: Phase::Tx,
        reset_phase: Phase::Tx,
    };

    /// Look up the role for a board id
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBoardId`] for anything other than 1 or 2.
    pub const fn from_board_id(board_id: u8) -> Result<Self, ConfigError> {
        match board_id {
            1 => Ok(Self::BOARD_1),
            2 => Ok(Self::BOARD_2),
            other => Err(ConfigError::InvalidBoardId(other)),
        }
    }

    /// Board id (1 or 2)
    #[must_use]
    pub const fn board_id(&self) -> u8 {
        self.board_id
    }

    /// Phase entered at startup
    #[must_use]
    pub const fn initial_phase(&self) -> Phase {
        self.initial_phase
    }

    /// Phase forced by a hard sync
    #[must_use]
    pub const fn reset_phase(&self) -> Phase {
        self.reset_phase
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RoleConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Board({}, start {}, reset {})",
            self.board_id,
            self.initial_phase,
            self.reset_phase
        );
    }
}

/// One framed inbound line, terminator stripped
///
/// Holds at most [`MAX_LINE_LEN`] bytes. Copied by value through the queue.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Message {
    bytes: Vec<u8, MAX_LINE_LEN>,
}

impl Message {
    /// Create an empty message
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Copy bytes into a message, truncating to [`MAX_LINE_LEN`]
    #[must_use]
    pub fn from_slice_truncated(data: &[u8]) -> Self {
        let len = data.len().min(MAX_LINE_LEN);
        let mut bytes = Vec::new();
        // Cannot fail: len is bounded by capacity
        let _ = bytes.extend_from_slice(&data[..len]);
        Self { bytes }
    }

    /// Append one byte, returns false when full
    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    /// Drop all bytes
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Raw payload
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload as text, if it is valid UTF-8
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    /// Payload length
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check if no more bytes fit
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Message {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:a}", self.bytes.as_slice());
    }
}

/// Why a phase wait ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeReason {
    /// The phase period elapsed
    Timeout,
    /// The operator trigger fired
    HardSync,
}

#[cfg(feature = "embedded")]
impl defmt::Format for WakeReason {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(f, "TIMEOUT"),
            Self::HardSync => defmt::write!(f, "HARD-SYNC"),
        }
    }
}

/// Configuration error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Board id outside {1, 2}
    InvalidBoardId(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBoardId(id) => write!(f, "invalid board id {id}, expected 1 or 2"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidBoardId(id) => defmt::write!(f, "InvalidBoardId({})", id),
        }
    }
}

/// A peripheral the phase manager depends on was not ready at startup
///
/// LED outputs and the EXTI button are constructed infallibly, so the link
/// UART is the only peripheral that can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareError {
    /// Link UART could not be configured
    LinkNotReady,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::LinkNotReady => "link uart",
        };
        write!(f, "{what} not ready")
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HardwareError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::LinkNotReady => defmt::write!(f, "link uart not ready"),
        }
    }
}
