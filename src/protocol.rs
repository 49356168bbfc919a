//! Line Protocol
//!
//! ASCII lines terminated by `\r` or `\n`. Inbound lines are framed by
//! [`crate::link::framer::LineFramer`]; this module owns the terminator rules
//! and formats the outbound data line a board emits on every TX phase.
//!
//! The UART relay that may sit between boards forwards bytes verbatim, so a
//! `\r\n` pair arrives as two terminators. The second one lands on an empty
//! buffer and produces nothing.

use heapless::String;

use crate::config::MSG_SIZE;
use crate::types::RoleConfig;

/// Carriage return
pub const CR: u8 = b'\r';

/// Line feed
pub const LF: u8 = b'\n';

/// Line ending appended to every outbound line
pub const LINE_ENDING: &str = "\r\n";

/// Check if a byte ends a line
#[must_use]
pub const fn is_terminator(byte: u8) -> bool {
    byte == CR || byte == LF
}

/// Outbound line formatter
///
/// Fixed-capacity buffer; text that does not fit is cut, but the line ending
/// always survives so the far side's framer still sees the line boundary.
pub struct OutboundLine {
    buffer: String<MSG_SIZE>,
}

impl OutboundLine {
    /// Create an empty line
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Format the per-phase data line for a board
    #[must_use]
    pub fn data(role: &RoleConfig) -> Self {
        let mut line = Self::new();
        line.data_from(role);
        line
    }

    /// Format the data line (`Data from board <id>`) in place
    pub fn data_from(&mut self, role: &RoleConfig) {
        self.buffer.clear();
        let _ = core::fmt::write(
            &mut self.buffer,
            format_args!("Data from board {}", role.board_id()),
        );
        self.terminate();
    }

    /// Format an arbitrary text line in place
    pub fn text(&mut self, text: &str) {
        self.buffer.clear();
        let room = MSG_SIZE - LINE_ENDING.len();
        // Cut on a char boundary so the buffer stays valid UTF-8
        let mut end = text.len().min(room);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let _ = self.buffer.push_str(&text[..end]);
        self.terminate();
    }

    fn terminate(&mut self) {
        let room = MSG_SIZE - LINE_ENDING.len();
        if self.buffer.len() > room {
            let mut end = room;
            while !self.buffer.is_char_boundary(end) {
                end -= 1;
            }
            self.buffer.truncate(end);
        }
        let _ = self.buffer.push_str(LINE_ENDING);
    }

    /// Line text including the line ending
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Line bytes including the line ending
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Line text without the line ending
    #[must_use]
    pub fn payload(&self) -> &str {
        self.buffer.trim_end_matches(['\r', '\n'])
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for OutboundLine {
    fn default() -> Self {
        Self::new()
    }
}
