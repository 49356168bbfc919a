//! Phase Manager
//!
//! Drives the TX/RX alternation. Each iteration:
//!
//! 1. apply the current phase: indicators, and one data line when TX
//! 2. wait up to one phase period for the hard-sync trigger
//! 3. timeout toggles the phase, a trigger forces the role's reset phase
//!
//! The next period is always measured from the end of the previous wait, so
//! a hard sync re-arms the timer from the moment it is processed.
//! Two boards running this loop drift apart over time; the trigger is the
//! only correction.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::Write;

use crate::config::PHASE_PERIOD_MS;
use crate::protocol::OutboundLine;
use crate::sync::indicators::PhaseIndicators;
use crate::sync::phase::{PhaseMachine, SharedPhase};
use crate::sync::trigger::TriggerEvent;
use crate::types::{HardwareError, Phase, RoleConfig, WakeReason};

/// Peripherals the manager needs before it can start
pub struct LinkHardware<P, W> {
    /// TX/RX indicator LEDs
    pub indicators: PhaseIndicators<P>,
    /// Outbound half of the link
    pub link: W,
}

/// Running totals kept by the manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Completed iterations
    pub cycles: u32,
    /// Waits that ended by timeout
    pub timeouts: u32,
    /// Waits that ended by hard sync
    pub hard_syncs: u32,
    /// Data lines written
    pub tx_lines: u32,
    /// Data lines that failed to write
    pub write_errors: u32,
    /// Indicator updates that failed
    pub indicator_errors: u32,
}

/// Phase manager
pub struct PhaseManager<'a, P, W, D> {
    role: RoleConfig,
    machine: PhaseMachine,
    hardware: LinkHardware<P, W>,
    delay: D,
    trigger: &'a TriggerEvent,
    shared: &'a SharedPhase,
    period_ms: u32,
    data_line: OutboundLine,
    stats: ManagerStats,
}

impl<'a, P, W, D> PhaseManager<'a, P, W, D>
where
    P: OutputPin,
    W: Write,
    D: DelayNs,
{
    /// Create a manager and publish the role's initial phase
    pub fn new(
        role: RoleConfig,
        hardware: LinkHardware<P, W>,
        delay: D,
        trigger: &'a TriggerEvent,
        shared: &'a SharedPhase,
    ) -> Self {
        let machine = PhaseMachine::new(&role);
        shared.store(machine.phase());
        Self {
            role,
            machine,
            hardware,
            delay,
            trigger,
            shared,
            period_ms: PHASE_PERIOD_MS,
            data_line: OutboundLine::data(&role),
            stats: ManagerStats::default(),
        }
    }

    /// Create a manager only if its hardware came up
    ///
    /// On failure nothing is published: readers of `shared` keep seeing no
    /// phase.
    ///
    /// # Errors
    ///
    /// Returns the hardware error unchanged.
    pub fn start(
        role: RoleConfig,
        hardware: Result<LinkHardware<P, W>, HardwareError>,
        delay: D,
        trigger: &'a TriggerEvent,
        shared: &'a SharedPhase,
    ) -> Result<Self, HardwareError> {
        let hardware = hardware?;
        Ok(Self::new(role, hardware, delay, trigger, shared))
    }

    /// Override the phase period
    #[must_use]
    pub fn with_period_ms(self, period_ms: u32) -> Self {
        Self { period_ms, ..self }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.machine.phase()
    }

    /// Board role
    #[must_use]
    pub const fn role(&self) -> &RoleConfig {
        &self.role
    }

    /// Phase period in milliseconds
    #[must_use]
    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Running totals
    #[must_use]
    pub const fn stats(&self) -> ManagerStats {
        self.stats
    }

    /// Indicator pair
    #[must_use]
    pub const fn indicators(&self) -> &PhaseIndicators<P> {
        &self.hardware.indicators
    }

    /// Outbound link
    #[must_use]
    pub const fn link(&self) -> &W {
        &self.hardware.link
    }

    /// Step 1: drive outputs for the current phase
    pub async fn apply_phase(&mut self) {
        let phase = self.machine.phase();
        if self.hardware.indicators.show(phase).is_err() {
            self.stats.indicator_errors = self.stats.indicator_errors.saturating_add(1);
            #[cfg(feature = "embedded")]
            defmt::warn!("indicator update failed for {}", phase);
        }

        match phase {
            Phase::Tx => {
                #[cfg(feature = "embedded")]
                defmt::info!(">>> TX phase (sending data)");
                self.send_data_line().await;
            }
            Phase::Rx => {
                #[cfg(feature = "embedded")]
                defmt::info!("<<< RX phase (waiting)");
            }
        }
    }

    async fn send_data_line(&mut self) {
        let link = &mut self.hardware.link;
        let written = match link.write_all(self.data_line.as_bytes()).await {
            Ok(()) => link.flush().await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => self.stats.tx_lines = self.stats.tx_lines.saturating_add(1),
            Err(_) => {
                self.stats.write_errors = self.stats.write_errors.saturating_add(1);
                #[cfg(feature = "embedded")]
                defmt::warn!("outbound data line failed");
            }
        }
    }

    /// Step 2: wait one period or until the trigger fires
    pub async fn wait(&mut self) -> WakeReason {
        self.trigger.wait_timeout(&mut self.delay, self.period_ms).await
    }

    /// Step 3: move to the next phase and publish it
    pub fn transition(&mut self, reason: WakeReason) -> Phase {
        match reason {
            WakeReason::Timeout => self.stats.timeouts = self.stats.timeouts.saturating_add(1),
            WakeReason::HardSync => {
                self.stats.hard_syncs = self.stats.hard_syncs.saturating_add(1);
                #[cfg(feature = "embedded")]
                defmt::warn!(
                    "!!! HARD SYNC detected, restarting cycle in {}",
                    self.machine.reset_phase()
                );
            }
        }
        self.machine = self.machine.next(reason);
        self.shared.store(self.machine.phase());
        self.stats.cycles = self.stats.cycles.saturating_add(1);
        self.machine.phase()
    }

    /// Run one full iteration, returns why the wait ended
    pub async fn step(&mut self) -> WakeReason {
        self.apply_phase().await;
        let reason = self.wait().await;
        self.transition(reason);
        reason
    }

    /// Run forever
    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }
}
