//! PhaseLink Main Application
//!
//! Entry point for the two-node link controller firmware.
//! Initializes hardware and spawns the tasks on three priority levels:
//!
//! - high (interrupt executor): link receive path and line framer
//! - medium (interrupt executor): phase manager and sync button
//! - low (thread mode): consumer

#![no_std]
#![no_main]

use defmt::{error, info, unwrap, warn};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Output, Pull};
use embassy_stm32::usart::{self, BufferedUart};
use embassy_stm32::{bind_interrupts, interrupt, interrupt::InterruptExt, peripherals};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use phaselink_firmware::config::{self, priorities, LINK_RX_BUFFER_SIZE, LINK_TX_BUFFER_SIZE};
use phaselink_firmware::hal::gpio::{indicator_leds, SyncButton};
use phaselink_firmware::hal::uart::{link_config, LinkResult, LinkRx, LinkTx};
use phaselink_firmware::link::framer::LineFramer;
use phaselink_firmware::link::queue::MessageQueue;
use phaselink_firmware::sync::consumer::Consumer;
use phaselink_firmware::sync::manager::{LinkHardware, PhaseManager};
use phaselink_firmware::sync::phase::SharedPhase;
use phaselink_firmware::sync::trigger::TriggerEvent;
use phaselink_firmware::types::{HardwareError, Message, RoleConfig};

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    USART2 => usart::BufferedInterruptHandler<peripherals::USART2>;
});

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MED: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[interrupt]
unsafe fn UART5() {
    unsafe { EXECUTOR_MED.on_interrupt() }
}

/// Framed lines, framer -> consumer
static LINK_QUEUE: MessageQueue = MessageQueue::new();

/// Hard-sync trigger, button -> phase manager
static SYNC_TRIGGER: TriggerEvent = TriggerEvent::new();

/// Current phase, phase manager -> consumer
static PHASE: SharedPhase = SharedPhase::new();

type ManagerHardware = LinkHardware<Output<'static>, LinkTx>;

/// NVIC priority for a level (STM32G4 implements the top 4 bits)
fn nvic_priority(level: u8) -> interrupt::Priority {
    interrupt::Priority::from(level << 4)
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner_low: Spawner) {
    info!("PhaseLink Firmware v{}", env!("CARGO_PKG_VERSION"));

    let role = match config::board_role() {
        Ok(role) => role,
        Err(e) => {
            error!("bad board configuration: {}", e);
            let () = core::future::pending().await;
            defmt::unreachable!();
        }
    };

    // Initialize STM32G474 peripherals with default clock configuration
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    info!("Peripherals initialized");

    interrupt::UART4.set_priority(nvic_priority(priorities::LINK_RX));
    let spawner_high = EXECUTOR_HIGH.start(interrupt::UART4);

    interrupt::UART5.set_priority(nvic_priority(priorities::PHASE));
    let spawner_med = EXECUTOR_MED.start(interrupt::UART5);

    // Link USART2 on the virtual COM port pins (PA3 = RX, PA2 = TX)
    let link = {
        static TX_BUF: StaticCell<[u8; LINK_TX_BUFFER_SIZE]> = StaticCell::new();
        static RX_BUF: StaticCell<[u8; LINK_RX_BUFFER_SIZE]> = StaticCell::new();
        BufferedUart::new(
            p.USART2,
            Irqs,
            p.PA3,
            p.PA2,
            TX_BUF.init([0; LINK_TX_BUFFER_SIZE]),
            RX_BUF.init([0; LINK_RX_BUFFER_SIZE]),
            link_config(),
        )
        .map(BufferedUart::split)
        .map_err(HardwareError::from)
    };

    // Indicators: PA6 = TX (red), PA5 = RX (green)
    let leds = indicator_leds(p.PA6, p.PA5);
    let button = SyncButton::new(ExtiInput::new(p.PC13, p.EXTI13, Pull::Up));

    let (link_tx, link_rx) = match link {
        Ok((tx, rx)) => (Ok(tx), Some(rx)),
        Err(e) => (Err(e), None),
    };

    if let Some(rx) = link_rx {
        unwrap!(spawner_high.spawn(link_rx_task(rx)));
    }

    let hardware = link_tx.map(|link| LinkHardware {
        indicators: leds,
        link,
    });
    unwrap!(spawner_med.spawn(phase_manager_task(role, hardware)));
    unwrap!(spawner_med.spawn(sync_button_task(button)));
    unwrap!(spawner_low.spawn(consumer_task()));

    info!("Tasks spawned");

    // Keep IO initialized
    let () = core::future::pending().await;
    defmt::unreachable!();
}

/// Link receive task - frames inbound bytes into the queue
#[embassy_executor::task]
async fn link_rx_task(mut rx: LinkRx) {
    let mut framer = LineFramer::new();
    let delivered = framer.pump(&mut rx, &LINK_QUEUE, &mut Delay).await;
    warn!(
        "link receive stream ended ({} lines, {} lost, {} overflowed bytes)",
        delivered,
        framer.lost(),
        framer.overflowed()
    );
}

/// Phase manager task - TX/RX alternation and hard sync
#[embassy_executor::task]
async fn phase_manager_task(role: RoleConfig, hardware: LinkResult<ManagerHardware>) {
    let mut manager = match PhaseManager::start(role, hardware, Delay, &SYNC_TRIGGER, &PHASE) {
        Ok(manager) => manager,
        Err(e) => {
            error!("phase manager not started: {}", e);
            return;
        }
    };

    info!(
        "--- BOARD {} STARTED ({} DEFAULT) ---",
        role.board_id(),
        role.initial_phase()
    );
    manager.run().await
}

/// Sync button task - forwards presses to the phase manager
#[embassy_executor::task]
async fn sync_button_task(mut button: SyncButton<'static>) {
    button.forward_to(&SYNC_TRIGGER).await
}

/// Consumer task - prints inbound lines while in RX
#[embassy_executor::task]
async fn consumer_task() {
    let mut consumer = Consumer::new(&LINK_QUEUE, &PHASE, |msg: &Message| {
        info!("[RX RECV]: {}", msg);
    });
    consumer.run().await
}
