//! Phase State
//!
//! Pure transition rules plus the atomic cell that publishes the current
//! phase to other tasks.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::types::{Phase, RoleConfig, WakeReason};

const UNSET: u8 = 0;
const TX: u8 = 1;
const RX: u8 = 2;

/// Phase cell shared between the phase manager and its readers
///
/// Single writer: only the phase manager stores. Any number of tasks may
/// load. Loads never observe a torn value, but may be one transition behind.
/// Holds no phase until the manager publishes its initial one.
pub struct SharedPhase {
    raw: AtomicU8,
}

impl SharedPhase {
    /// Create an empty cell
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: AtomicU8::new(UNSET),
        }
    }

    /// Publish a phase (phase manager only)
    pub fn store(&self, phase: Phase) {
        let raw = match phase {
            Phase::Tx => TX,
            Phase::Rx => RX,
        };
        self.raw.store(raw, Ordering::Release);
    }

    /// Current phase, `None` if the manager never started
    #[must_use]
    pub fn load(&self) -> Option<Phase> {
        match self.raw.load(Ordering::Acquire) {
            TX => Some(Phase::Tx),
            RX => Some(Phase::Rx),
            _ => None,
        }
    }

    /// Check if the published phase is RX
    #[must_use]
    pub fn is_rx(&self) -> bool {
        self.load() == Some(Phase::Rx)
    }
}

impl Default for SharedPhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase state machine (immutable)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseMachine {
    /// Current phase
    phase: Phase,
    /// Target of a hard sync
    reset_phase: Phase,
}

impl PhaseMachine {
    /// Start in the role's initial phase
    #[must_use]
    pub const fn new(role: &RoleConfig) -> Self {
        Self {
            phase: role.initial_phase(),
            reset_phase: role.reset_phase(),
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Phase a hard sync snaps to
    #[must_use]
    pub const fn reset_phase(&self) -> Phase {
        self.reset_phase
    }

    /// Apply a wake reason (returns new state)
    ///
    /// A timeout toggles. A hard sync overrides to the reset phase whatever
    /// the current phase is; it never toggles.
    #[must_use]
    pub const fn next(self, reason: WakeReason) -> Self {
        let phase = match reason {
            WakeReason::Timeout => self.phase.toggle(),
            WakeReason::HardSync => self.reset_phase,
        };
        Self { phase, ..self }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PhaseMachine {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Phase({}, reset {})", self.phase, self.reset_phase);
    }
}
