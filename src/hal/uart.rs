//! Link USART
//!
//! Buffered, interrupt-driven USART for the board-to-board link. The
//! receive half feeds the line framer; the transmit half carries the
//! per-phase data line.

use embassy_stm32::usart::{self, BufferedUartRx, BufferedUartTx, DataBits, Parity, StopBits};

use crate::config::LINK_BAUD_RATE;
use crate::types::HardwareError;

/// Receive half of the link
pub type LinkRx = BufferedUartRx<'static>;

/// Transmit half of the link
pub type LinkTx = BufferedUartTx<'static>;

/// Link result with startup errors mapped to [`HardwareError`]
pub type LinkResult<T> = Result<T, HardwareError>;

/// USART configuration for the link: 115200 8N1
#[must_use]
pub fn link_config() -> usart::Config {
    let mut config = usart::Config::default();
    config.baudrate = LINK_BAUD_RATE;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;
    config
}

impl From<usart::ConfigError> for HardwareError {
    fn from(_: usart::ConfigError) -> Self {
        Self::LinkNotReady
    }
}
