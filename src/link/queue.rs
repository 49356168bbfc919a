//! Bounded Message Queue
//!
//! Fixed-capacity FIFO between the line framer (interrupt priority) and the
//! consumer task. Pushing never waits: a full queue rejects the message.
//! Popping waits until a message is available.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::config::MSG_QUEUE_DEPTH;
use crate::types::Message;

/// Destination for framed lines
///
/// Implementations must not block; they run in the framer's context.
pub trait MessageSink {
    /// Offer a message, returns whether it was accepted
    fn try_push(&self, msg: Message) -> bool;
}

/// Inbound message queue
///
/// Safe to share between interrupt executors and thread mode; intended to
/// live in a `static`.
pub struct MessageQueue {
    channel: Channel<CriticalSectionRawMutex, Message, MSG_QUEUE_DEPTH>,
}

impl MessageQueue {
    /// Create an empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Offer a message without waiting
    ///
    /// Returns `false` and discards the message when the queue is full. The
    /// messages already queued are left untouched.
    pub fn push(&self, msg: Message) -> bool {
        self.channel.try_send(msg).is_ok()
    }

    /// Wait for the oldest message
    pub async fn pop(&self) -> Message {
        self.channel.receive().await
    }

    /// Take the oldest message if one is queued
    pub fn try_pop(&self) -> Option<Message> {
        self.channel.try_receive().ok()
    }

    /// Number of queued messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Check if full
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    /// Maximum number of queued messages
    #[must_use]
    pub const fn capacity(&self) -> usize {
        MSG_QUEUE_DEPTH
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSink for MessageQueue {
    fn try_push(&self, msg: Message) -> bool {
        self.push(msg)
    }
}
