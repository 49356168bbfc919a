//! Line Framer
//!
//! Turns the raw link byte stream into [`Message`] values.
//!
//! The framer runs on the receive path at the highest priority, so every
//! call is O(1), allocation-free and never waits. Framing rules:
//!
//! - CR or LF with buffered bytes: emit the buffered bytes as one message
//! - CR or LF with nothing buffered: ignored (no empty messages)
//! - any other byte: appended while there is room, silently dropped after
//!   [`MAX_LINE_LEN`] bytes until the next terminator ends the (truncated) line

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::Read;

use crate::config::{LINK_ERROR_BACKOFF_MS, LINK_READ_CHUNK, MAX_LINE_LEN};
use crate::link::queue::MessageSink;
use crate::protocol::is_terminator;
use crate::types::Message;

/// What a single byte did to the framer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// Byte appended to the current line
    Buffered,
    /// Line full, byte dropped
    Overflowed,
    /// Terminator on an empty line
    Ignored,
    /// Line completed and accepted by the sink
    Delivered,
    /// Line completed but the sink was full
    Lost,
}

#[cfg(feature = "embedded")]
impl defmt::Format for FrameEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Buffered => defmt::write!(f, "Buffered"),
            Self::Overflowed => defmt::write!(f, "Overflowed"),
            Self::Ignored => defmt::write!(f, "Ignored"),
            Self::Delivered => defmt::write!(f, "Delivered"),
            Self::Lost => defmt::write!(f, "Lost"),
        }
    }
}

/// Line framer with persistent accumulation buffer
pub struct LineFramer {
    /// Bytes since the last emitted line
    line: Message,
    /// Bytes dropped because the line was full
    overflowed: u32,
    /// Lines rejected by a full sink
    lost: u32,
    /// Reads that returned an error
    rx_errors: u32,
}

impl LineFramer {
    /// Create a framer with an empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line: Message::new(),
            overflowed: 0,
            lost: 0,
            rx_errors: 0,
        }
    }

    /// Feed a byte, returns a completed line if this byte ended one
    pub fn feed(&mut self, byte: u8) -> Option<Message> {
        if is_terminator(byte) {
            if self.line.is_empty() {
                return None;
            }
            Some(core::mem::take(&mut self.line))
        } else {
            if !self.line.push(byte) {
                self.overflowed = self.overflowed.saturating_add(1);
            }
            None
        }
    }

    /// Feed a byte and hand any completed line to `sink`
    ///
    /// A line the sink rejects is gone; the framer only counts it.
    pub fn on_byte<S: MessageSink + ?Sized>(&mut self, byte: u8, sink: &S) -> FrameEvent {
        if is_terminator(byte) {
            return match self.feed(byte) {
                Some(line) => {
                    if sink.try_push(line) {
                        FrameEvent::Delivered
                    } else {
                        self.lost = self.lost.saturating_add(1);
                        FrameEvent::Lost
                    }
                }
                None => FrameEvent::Ignored,
            };
        }

        if self.line.len() < MAX_LINE_LEN {
            self.feed(byte);
            FrameEvent::Buffered
        } else {
            self.feed(byte);
            FrameEvent::Overflowed
        }
    }

    /// Feed a run of bytes, returns how many lines the sink accepted
    pub fn on_bytes<S: MessageSink + ?Sized>(&mut self, bytes: &[u8], sink: &S) -> usize {
        bytes
            .iter()
            .filter(|&&b| self.on_byte(b, sink) == FrameEvent::Delivered)
            .count()
    }

    /// Read from `reader` and frame everything it yields into `sink`
    ///
    /// Read errors (UART overrun, framing, noise) are counted and followed by
    /// a [`LINK_ERROR_BACKOFF_MS`] pause on `delay`.
    /// Returns at end of stream with the number of lines the sink accepted;
    /// a UART reader never ends, so on target this runs forever.
    pub async fn pump<R, S, D>(&mut self, reader: &mut R, sink: &S, delay: &mut D) -> usize
    where
        R: Read,
        S: MessageSink + ?Sized,
        D: DelayNs,
    {
        let mut chunk = [0u8; LINK_READ_CHUNK];
        let mut delivered = 0;
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => return delivered,
                Ok(n) => delivered += self.on_bytes(&chunk[..n], sink),
                Err(_) => {
                    self.rx_errors = self.rx_errors.saturating_add(1);
                    #[cfg(feature = "embedded")]
                    defmt::warn!("link read error");
                    delay.delay_ms(LINK_ERROR_BACKOFF_MS).await;
                }
            }
        }
    }

    /// Bytes currently buffered
    #[must_use]
    pub fn pending(&self) -> usize {
        self.line.len()
    }

    /// Total bytes dropped to overflow
    #[must_use]
    pub const fn overflowed(&self) -> u32 {
        self.overflowed
    }

    /// Total lines lost to a full sink
    #[must_use]
    pub const fn lost(&self) -> u32 {
        self.lost
    }

    /// Total failed reads seen by [`Self::pump`]
    #[must_use]
    pub const fn rx_errors(&self) -> u32 {
        self.rx_errors
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
