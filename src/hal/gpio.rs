//! GPIO Abstractions
//!
//! Type-safe wrappers for the phase indicator LEDs and the hard-sync button.

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pin, Speed};
use embassy_stm32::Peripheral;

use crate::sync::indicators::PhaseIndicators;
use crate::sync::trigger::TriggerEvent;

/// Indicator pair on push-pull outputs
pub type IndicatorLeds = PhaseIndicators<Output<'static>>;

/// Configure both LEDs as outputs, initially off
#[must_use]
pub fn indicator_leds(
    tx: impl Peripheral<P = impl Pin> + 'static,
    rx: impl Peripheral<P = impl Pin> + 'static,
) -> IndicatorLeds {
    let tx = Output::new(tx, Level::Low, Speed::Low);
    let rx = Output::new(rx, Level::Low, Speed::Low);
    PhaseIndicators::new(tx, rx)
}

/// Hard-sync button (active low with internal pull-up)
pub struct SyncButton<'d> {
    pin: ExtiInput<'d>,
}

impl<'d> SyncButton<'d> {
    /// Wrap an EXTI input configured with a pull-up
    #[must_use]
    pub fn new(pin: ExtiInput<'d>) -> Self {
        Self { pin }
    }

    /// Wait for the next press edge (high to low)
    pub async fn wait_for_press(&mut self) {
        self.pin.wait_for_falling_edge().await;
    }

    /// Post a trigger for every press, forever
    ///
    /// Presses that land while a trigger is still pending collapse into it.
    pub async fn forward_to(&mut self, trigger: &TriggerEvent) -> ! {
        loop {
            self.wait_for_press().await;
            trigger.post();
        }
    }
}
