//! Hardware Abstraction Layer
//!
//! Board bring-up for the Nucleo-G474RE: the link USART, the two phase
//! indicator LEDs and the hard-sync button. Everything above this layer
//! only sees `embedded-hal` / `embedded-io-async` traits.

pub mod gpio;
pub mod uart;
