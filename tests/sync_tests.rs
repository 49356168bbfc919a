//! Phase Synchronisation Tests
//!
//! Tests for the phase state machine, the shared phase cell, the hard-sync
//! trigger, the phase manager loop and the consumer.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test sync_tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Write};

use phaselink_firmware::config::PHASE_PERIOD_MS;
use phaselink_firmware::link::queue::MessageQueue;
use phaselink_firmware::sync::consumer::{Consumer, Disposition};
use phaselink_firmware::sync::indicators::PhaseIndicators;
use phaselink_firmware::sync::manager::{LinkHardware, PhaseManager};
use phaselink_firmware::sync::phase::{PhaseMachine, SharedPhase};
use phaselink_firmware::sync::trigger::TriggerEvent;
use phaselink_firmware::types::{HardwareError, Message, Phase, RoleConfig, WakeReason};

// ============================================================================
// Fakes
// ============================================================================

/// Output pin whose level can be inspected after it is moved
#[derive(Clone, Default)]
struct FakePin {
    high: Rc<Cell<bool>>,
}

impl FakePin {
    fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl PinErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

/// Outbound link that records everything written
#[derive(Default)]
struct Wire {
    data: Vec<u8>,
}

impl Wire {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl ErrorType for Wire {
    type Error = Infallible;
}

impl Write for Wire {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Outbound link that always fails
struct BrokenWire;

impl ErrorType for BrokenWire {
    type Error = ErrorKind;
}

impl Write for BrokenWire {
    async fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
        Err(ErrorKind::Other)
    }
}

/// Delay that completes at once, so every wait without a pending trigger times out
struct InstantDelay;

impl DelayNs for InstantDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// Simulated millisecond clock with scheduled trigger presses
#[derive(Default)]
struct SimClock {
    now: Cell<u64>,
    presses: RefCell<VecDeque<u64>>,
    armed: RefCell<Vec<u64>>,
}

impl SimClock {
    fn press_at(&self, t: u64) {
        self.presses.borrow_mut().push_back(t);
    }

    fn now(&self) -> u64 {
        self.now.get()
    }

    fn armed(&self) -> Vec<u64> {
        self.armed.borrow().clone()
    }
}

/// Delay driven by a [`SimClock`]
///
/// If a press is scheduled before the deadline, time jumps to the press,
/// the trigger is posted and the delay never completes, so the trigger wins.
struct SimDelay<'a> {
    clock: &'a SimClock,
    trigger: &'a TriggerEvent,
}

impl DelayNs for SimDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        let start = self.clock.now();
        let deadline = start + u64::from(ms);
        self.clock.armed.borrow_mut().push(deadline);

        let press = {
            let mut presses = self.clock.presses.borrow_mut();
            match presses.front() {
                Some(&t) if t <= deadline => presses.pop_front(),
                _ => None,
            }
        };

        match press {
            Some(t) => {
                self.clock.now.set(t.max(start));
                self.trigger.post();
                core::future::pending::<()>().await;
            }
            None => self.clock.now.set(deadline),
        }
    }
}

struct Rig {
    tx: FakePin,
    rx: FakePin,
    trigger: TriggerEvent,
    shared: SharedPhase,
}

impl Rig {
    fn new() -> Self {
        Self {
            tx: FakePin::default(),
            rx: FakePin::default(),
            trigger: TriggerEvent::new(),
            shared: SharedPhase::new(),
        }
    }

    fn hardware<W>(&self, link: W) -> LinkHardware<FakePin, W> {
        LinkHardware {
            indicators: PhaseIndicators::new(self.tx.clone(), self.rx.clone()),
            link,
        }
    }

    fn manager<D: DelayNs>(&self, role: RoleConfig, delay: D) -> PhaseManager<'_, FakePin, Wire, D> {
        PhaseManager::new(role, self.hardware(Wire::default()), delay, &self.trigger, &self.shared)
    }
}

// ============================================================================
// Phase Machine
// ============================================================================

#[test]
fn machine_starts_in_initial_phase() {
    assert_eq!(PhaseMachine::new(&RoleConfig::BOARD_1).phase(), Phase::Rx);
    assert_eq!(PhaseMachine::new(&RoleConfig::BOARD_2).phase(), Phase::Tx);
}

#[test]
fn timeout_toggles() {
    let m = PhaseMachine::new(&RoleConfig::BOARD_1);
    let m = m.next(WakeReason::Timeout);
    assert_eq!(m.phase(), Phase::Tx);
    let m = m.next(WakeReason::Timeout);
    assert_eq!(m.phase(), Phase::Rx);
}

#[test]
fn hard_sync_overrides_from_either_phase() {
    for role in [RoleConfig::BOARD_1, RoleConfig::BOARD_2] {
        let start = PhaseMachine::new(&role);
        let toggled = start.next(WakeReason::Timeout);
        assert_eq!(start.next(WakeReason::HardSync).phase(), role.reset_phase());
        assert_eq!(toggled.next(WakeReason::HardSync).phase(), role.reset_phase());
    }
}

#[test]
fn repeated_hard_sync_never_toggles() {
    let mut m = PhaseMachine::new(&RoleConfig::BOARD_2);
    for _ in 0..5 {
        m = m.next(WakeReason::HardSync);
        assert_eq!(m.phase(), Phase::Tx);
    }
}

// ============================================================================
// Shared Phase
// ============================================================================

#[test]
fn shared_phase_starts_empty() {
    let shared = SharedPhase::new();
    assert_eq!(shared.load(), None);
    assert!(!shared.is_rx());
}

#[test]
fn shared_phase_store_load() {
    let shared = SharedPhase::new();
    shared.store(Phase::Rx);
    assert_eq!(shared.load(), Some(Phase::Rx));
    assert!(shared.is_rx());
    shared.store(Phase::Tx);
    assert_eq!(shared.load(), Some(Phase::Tx));
}

// ============================================================================
// Trigger
// ============================================================================

#[test]
fn trigger_starts_clear() {
    let trigger = TriggerEvent::new();
    assert!(!trigger.is_pending());
    assert!(!trigger.try_take());
}

#[test]
fn trigger_bursts_coalesce() {
    let trigger = TriggerEvent::new();
    trigger.post();
    trigger.post();
    trigger.post();

    assert!(trigger.is_pending());
    assert!(trigger.try_take());
    assert!(!trigger.try_take());
}

#[test]
fn trigger_clear_drops_pending() {
    let trigger = TriggerEvent::new();
    trigger.post();
    trigger.clear();
    assert!(!trigger.is_pending());
}

#[test]
fn wait_timeout_times_out_without_trigger() {
    let trigger = TriggerEvent::new();
    let reason = block_on(trigger.wait_timeout(&mut InstantDelay, 5_000));
    assert_eq!(reason, WakeReason::Timeout);
}

#[test]
fn pending_trigger_wins_and_is_consumed() {
    let trigger = TriggerEvent::new();
    trigger.post();

    let reason = block_on(trigger.wait_timeout(&mut InstantDelay, 5_000));

    assert_eq!(reason, WakeReason::HardSync);
    assert!(!trigger.is_pending());
}

#[test]
fn trigger_posted_between_waits_is_kept_for_next_wait_only() {
    let trigger = TriggerEvent::new();

    let first = block_on(trigger.wait_timeout(&mut InstantDelay, 5_000));
    trigger.post();
    let second = block_on(trigger.wait_timeout(&mut InstantDelay, 5_000));
    let third = block_on(trigger.wait_timeout(&mut InstantDelay, 5_000));

    assert_eq!(first, WakeReason::Timeout);
    assert_eq!(second, WakeReason::HardSync);
    assert_eq!(third, WakeReason::Timeout);
}

#[test]
fn trigger_during_wait_wakes_early() {
    let clock = SimClock::default();
    let trigger = TriggerEvent::new();
    clock.press_at(1_200);
    let mut delay = SimDelay {
        clock: &clock,
        trigger: &trigger,
    };

    let reason = block_on(trigger.wait_timeout(&mut delay, 5_000));

    assert_eq!(reason, WakeReason::HardSync);
    assert_eq!(clock.now(), 1_200);
    assert!(!trigger.is_pending());
}

#[test]
fn wait_for_trigger_returns_once_posted() {
    let trigger = TriggerEvent::new();
    trigger.post();
    block_on(trigger.wait());
    assert!(!trigger.is_pending());
}

// ============================================================================
// Indicators
// ============================================================================

#[test]
fn indicators_are_mutually_exclusive() {
    let tx = FakePin::default();
    let rx = FakePin::default();
    let mut leds = PhaseIndicators::new(tx.clone(), rx.clone());

    leds.show(Phase::Tx).unwrap();
    assert!(tx.is_high() && !rx.is_high());
    assert_eq!(leds.lit(), Some(Phase::Tx));

    leds.show(Phase::Rx).unwrap();
    assert!(!tx.is_high() && rx.is_high());
    assert_eq!(leds.lit(), Some(Phase::Rx));

    leds.off().unwrap();
    assert!(!tx.is_high() && !rx.is_high());
    assert_eq!(leds.lit(), None);
}

// ============================================================================
// Phase Manager
// ============================================================================

#[test]
fn new_manager_publishes_initial_phase() {
    let rig = Rig::new();
    let manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    assert_eq!(manager.phase(), Phase::Rx);
    assert_eq!(rig.shared.load(), Some(Phase::Rx));
    assert_eq!(manager.period_ms(), PHASE_PERIOD_MS);
}

#[test]
fn failed_hardware_never_publishes_phase() {
    let rig = Rig::new();

    let result = PhaseManager::<FakePin, Wire, InstantDelay>::start(
        RoleConfig::BOARD_2,
        Err(HardwareError::LinkNotReady),
        InstantDelay,
        &rig.trigger,
        &rig.shared,
    );

    assert_eq!(result.err(), Some(HardwareError::LinkNotReady));
    assert_eq!(rig.shared.load(), None);
    assert!(!rig.tx.is_high() && !rig.rx.is_high());
}

#[test]
fn ready_hardware_starts_manager() {
    let rig = Rig::new();

    let manager = PhaseManager::start(
        RoleConfig::BOARD_2,
        Ok(rig.hardware(Wire::default())),
        InstantDelay,
        &rig.trigger,
        &rig.shared,
    )
    .unwrap();

    assert_eq!(manager.phase(), Phase::Tx);
    assert_eq!(rig.shared.load(), Some(Phase::Tx));
}

#[test]
fn rx_phase_lights_rx_and_sends_nothing() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    block_on(manager.apply_phase());

    assert!(rig.rx.is_high());
    assert!(!rig.tx.is_high());
    assert!(manager.link().data.is_empty());
}

#[test]
fn tx_phase_lights_tx_and_sends_data_line() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_2, InstantDelay);

    block_on(manager.apply_phase());

    assert!(rig.tx.is_high());
    assert!(!rig.rx.is_high());
    assert_eq!(manager.link().text(), "Data from board 2\r\n");
    assert_eq!(manager.stats().tx_lines, 1);
}

#[test]
fn alternates_without_trigger() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    let mut seen = vec![manager.phase()];
    for _ in 0..4 {
        assert_eq!(block_on(manager.step()), WakeReason::Timeout);
        seen.push(manager.phase());
        assert_eq!(rig.shared.load(), Some(manager.phase()));
    }

    assert_eq!(seen, vec![Phase::Rx, Phase::Tx, Phase::Rx, Phase::Tx, Phase::Rx]);
    assert_eq!(manager.stats().timeouts, 4);
    assert_eq!(manager.stats().cycles, 4);
}

#[test]
fn one_data_line_per_tx_entry() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    for _ in 0..6 {
        block_on(manager.step());
    }

    // RX, TX, RX, TX, RX, TX applied
    assert_eq!(manager.link().text(), "Data from board 1\r\n".repeat(3));
}

#[test]
fn pending_trigger_forces_reset_phase() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_2, InstantDelay);

    // TX -> RX by timeout
    block_on(manager.step());
    assert_eq!(manager.phase(), Phase::Rx);

    rig.trigger.post();
    assert_eq!(block_on(manager.step()), WakeReason::HardSync);
    assert_eq!(manager.phase(), Phase::Tx);
    assert_eq!(manager.stats().hard_syncs, 1);
}

#[test]
fn hard_sync_in_reset_phase_keeps_phase() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    rig.trigger.post();
    block_on(manager.step());

    assert_eq!(manager.phase(), Phase::Rx);
}

#[test]
fn trigger_burst_counts_as_one_sync() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);

    rig.trigger.post();
    rig.trigger.post();
    rig.trigger.post();

    assert_eq!(block_on(manager.step()), WakeReason::HardSync);
    assert_eq!(block_on(manager.step()), WakeReason::Timeout);
    assert_eq!(manager.stats().hard_syncs, 1);
}

#[test]
fn trigger_posted_during_tx_write_is_kept_for_next_wait() {
    let rig = Rig::new();
    let mut manager = rig.manager(RoleConfig::BOARD_2, InstantDelay);

    block_on(manager.apply_phase());
    rig.trigger.post();
    let reason = block_on(manager.wait());

    assert_eq!(reason, WakeReason::HardSync);
}

#[test]
fn write_failure_is_counted_and_loop_continues() {
    let rig = Rig::new();
    let mut manager = PhaseManager::new(
        RoleConfig::BOARD_2,
        rig.hardware(BrokenWire),
        InstantDelay,
        &rig.trigger,
        &rig.shared,
    );

    assert_eq!(block_on(manager.step()), WakeReason::Timeout);
    assert_eq!(manager.phase(), Phase::Rx);
    assert_eq!(manager.stats().write_errors, 1);
    assert_eq!(manager.stats().tx_lines, 0);
}

#[test]
fn custom_period_is_used_for_wait() {
    let rig = Rig::new();
    let clock = SimClock::default();
    let delay = SimDelay {
        clock: &clock,
        trigger: &rig.trigger,
    };
    let mut manager = rig.manager(RoleConfig::BOARD_1, delay).with_period_ms(250);

    block_on(manager.step());
    block_on(manager.step());

    assert_eq!(clock.armed(), vec![250, 500]);
}

#[test]
fn board_one_scenario_with_mid_rx_trigger() {
    let rig = Rig::new();
    let clock = SimClock::default();
    clock.press_at(13_000);
    let delay = SimDelay {
        clock: &clock,
        trigger: &rig.trigger,
    };
    let mut manager = rig.manager(RoleConfig::BOARD_1, delay);

    // Boot: RX
    assert_eq!(manager.phase(), Phase::Rx);

    // t = 5000: timeout -> TX
    assert_eq!(block_on(manager.step()), WakeReason::Timeout);
    assert_eq!(clock.now(), 5_000);
    assert_eq!(manager.phase(), Phase::Tx);

    // TX applied at 5000, t = 10000: timeout -> RX
    assert_eq!(block_on(manager.step()), WakeReason::Timeout);
    assert_eq!(manager.link().text(), "Data from board 1\r\n");
    assert_eq!(clock.now(), 10_000);
    assert_eq!(manager.phase(), Phase::Rx);

    // t = 13000: trigger mid-RX -> stays RX
    assert_eq!(block_on(manager.step()), WakeReason::HardSync);
    assert_eq!(clock.now(), 13_000);
    assert_eq!(manager.phase(), Phase::Rx);
    assert!(rig.rx.is_high());

    // Next timeout re-armed from the trigger: t = 18000 -> TX
    assert_eq!(block_on(manager.step()), WakeReason::Timeout);
    assert_eq!(clock.now(), 18_000);
    assert_eq!(manager.phase(), Phase::Tx);

    assert_eq!(clock.armed(), vec![5_000, 10_000, 15_000, 18_000]);
}

#[test]
fn two_boards_realign_after_simultaneous_trigger() {
    let clock_1 = SimClock::default();
    let clock_2 = SimClock::default();
    let rig_1 = Rig::new();
    let rig_2 = Rig::new();

    // The operator's presses land at slightly different local times
    clock_1.press_at(25_000);
    clock_2.press_at(24_510);

    let mut board_1 = rig_1.manager(
        RoleConfig::BOARD_1,
        SimDelay {
            clock: &clock_1,
            trigger: &rig_1.trigger,
        },
    );
    let mut board_2 = rig_2.manager(
        RoleConfig::BOARD_2,
        SimDelay {
            clock: &clock_2,
            trigger: &rig_2.trigger,
        },
    );

    while clock_1.now() < 25_000 {
        block_on(board_1.step());
    }
    while clock_2.now() < 24_510 {
        block_on(board_2.step());
    }

    assert_eq!(board_1.phase(), Phase::Rx);
    assert_eq!(board_2.phase(), Phase::Tx);
    assert_ne!(board_1.phase(), board_2.phase());
}

// ============================================================================
// Consumer
// ============================================================================

fn msg(text: &str) -> Message {
    Message::from_slice_truncated(text.as_bytes())
}

#[test]
fn consumer_surfaces_in_rx() {
    let queue = MessageQueue::new();
    let phase = SharedPhase::new();
    let seen = RefCell::new(Vec::new());
    phase.store(Phase::Rx);
    queue.push(msg("hello"));

    let mut consumer = Consumer::new(&queue, &phase, |m: &Message| seen.borrow_mut().push(m.clone()));
    assert_eq!(block_on(consumer.step()), Disposition::Surfaced);
    assert_eq!(consumer.surfaced(), 1);
    drop(consumer);

    assert_eq!(seen.into_inner(), vec![msg("hello")]);
}

#[test]
fn consumer_discards_in_tx() {
    let queue = MessageQueue::new();
    let phase = SharedPhase::new();
    let seen = RefCell::new(Vec::new());
    phase.store(Phase::Tx);
    queue.push(msg("own echo"));

    let mut consumer = Consumer::new(&queue, &phase, |m: &Message| seen.borrow_mut().push(m.clone()));
    assert_eq!(block_on(consumer.step()), Disposition::Discarded);
    assert_eq!(consumer.discarded(), 1);
    assert!(queue.is_empty());
    drop(consumer);

    assert!(seen.into_inner().is_empty());
}

#[test]
fn consumer_discards_before_manager_starts() {
    let queue = MessageQueue::new();
    let phase = SharedPhase::new();
    let mut count = 0u32;

    let mut consumer = Consumer::new(&queue, &phase, |_: &Message| count += 1);
    assert_eq!(consumer.handle(&msg("early")), Disposition::Discarded);
    drop(consumer);

    assert_eq!(count, 0);
}

#[test]
fn consumer_uses_phase_at_pop_time() {
    let queue = MessageQueue::new();
    let phase = SharedPhase::new();
    let seen = RefCell::new(Vec::new());

    // Both arrive while TX, the phase flips before the second pop
    phase.store(Phase::Tx);
    queue.push(msg("during tx"));
    queue.push(msg("popped in rx"));

    let mut consumer = Consumer::new(&queue, &phase, |m: &Message| seen.borrow_mut().push(m.clone()));
    assert_eq!(block_on(consumer.step()), Disposition::Discarded);
    phase.store(Phase::Rx);
    assert_eq!(block_on(consumer.step()), Disposition::Surfaced);
    drop(consumer);

    assert_eq!(seen.into_inner(), vec![msg("popped in rx")]);
}

#[test]
fn consumer_follows_manager_phase() {
    let rig = Rig::new();
    let queue = MessageQueue::new();
    let seen = RefCell::new(Vec::new());
    let mut manager = rig.manager(RoleConfig::BOARD_1, InstantDelay);
    let mut consumer = Consumer::new(&queue, &rig.shared, |m: &Message| {
        seen.borrow_mut().push(m.clone());
    });

    // RX: surfaced
    queue.push(msg("a"));
    block_on(consumer.step());

    // Timeout -> TX: discarded
    block_on(manager.step());
    queue.push(msg("b"));
    block_on(consumer.step());

    // Timeout -> RX: surfaced
    block_on(manager.step());
    queue.push(msg("c"));
    block_on(consumer.step());

    assert_eq!(consumer.surfaced(), 2);
    assert_eq!(consumer.discarded(), 1);
    drop(consumer);
    assert_eq!(seen.into_inner(), vec![msg("a"), msg("c")]);
}
