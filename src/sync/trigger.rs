//! Hard-Sync Trigger
//!
//! Sticky one-bit wake signal posted by the operator button and consumed by
//! the phase manager's timed wait. Posting is safe from any priority.
//! Posts that arrive before the manager waits collapse into one.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;

use crate::types::WakeReason;

/// Coalescing trigger event
pub struct TriggerEvent {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl TriggerEvent {
    /// Create a cleared trigger
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Set the trigger (idempotent while pending)
    pub fn post(&self) {
        self.signal.signal(());
    }

    /// Check if a trigger is pending without consuming it
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.signal.signaled()
    }

    /// Consume a pending trigger, returns whether there was one
    pub fn try_take(&self) -> bool {
        self.signal.try_take().is_some()
    }

    /// Drop a pending trigger
    pub fn clear(&self) {
        self.signal.reset();
    }

    /// Wait for the trigger, consuming it
    pub async fn wait(&self) {
        self.signal.wait().await;
    }

    /// Wait for the trigger for at most `timeout_ms`
    ///
    /// A trigger that is already pending wins immediately and is consumed.
    /// On timeout the trigger stays clear.
    pub async fn wait_timeout<D: DelayNs>(&self, delay: &mut D, timeout_ms: u32) -> WakeReason {
        match select(self.signal.wait(), delay.delay_ms(timeout_ms)).await {
            Either::First(()) => WakeReason::HardSync,
            Either::Second(()) => WakeReason::Timeout,
        }
    }
}

impl Default for TriggerEvent {
    fn default() -> Self {
        Self::new()
    }
}
