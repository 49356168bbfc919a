//! Message Consumer
//!
//! Pops framed lines and surfaces them only while the board is listening.
//! Lines popped during TX (typically the board's own echo) are dropped
//! without side effects. The phase is read at pop time, so a line that
//! arrived just before a transition may be judged by the new phase.

use crate::link::queue::MessageQueue;
use crate::sync::phase::SharedPhase;
use crate::types::{Message, Phase};

/// Receiver of surfaced lines
pub trait MessageObserver {
    /// Called for each line popped during RX
    fn surface(&mut self, msg: &Message);
}

impl<F: FnMut(&Message)> MessageObserver for F {
    fn surface(&mut self, msg: &Message) {
        self(msg);
    }
}

/// What the consumer did with a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Passed to the observer
    Surfaced,
    /// Dropped (not in RX)
    Discarded,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Disposition {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Surfaced => defmt::write!(f, "Surfaced"),
            Self::Discarded => defmt::write!(f, "Discarded"),
        }
    }
}

/// Consumer task state
pub struct Consumer<'a, O> {
    queue: &'a MessageQueue,
    phase: &'a SharedPhase,
    observer: O,
    surfaced: u32,
    discarded: u32,
}

impl<'a, O: MessageObserver> Consumer<'a, O> {
    /// Create a consumer
    pub fn new(queue: &'a MessageQueue, phase: &'a SharedPhase, observer: O) -> Self {
        Self {
            queue,
            phase,
            observer,
            surfaced: 0,
            discarded: 0,
        }
    }

    /// Decide on one line using the phase published right now
    pub fn handle(&mut self, msg: &Message) -> Disposition {
        match self.phase.load() {
            Some(Phase::Rx) => {
                self.observer.surface(msg);
                self.surfaced = self.surfaced.saturating_add(1);
                Disposition::Surfaced
            }
            Some(Phase::Tx) | None => {
                self.discarded = self.discarded.saturating_add(1);
                Disposition::Discarded
            }
        }
    }

    /// Wait for one line and handle it
    pub async fn step(&mut self) -> Disposition {
        let msg = self.queue.pop().await;
        self.handle(&msg)
    }

    /// Run forever
    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }

    /// Lines passed to the observer
    #[must_use]
    pub const fn surfaced(&self) -> u32 {
        self.surfaced
    }

    /// Lines dropped
    #[must_use]
    pub const fn discarded(&self) -> u32 {
        self.discarded
    }

    /// Observer
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }
}
