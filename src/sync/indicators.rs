//! Phase indicator outputs: one LED per phase, never both lit.

use embedded_hal::digital::OutputPin;

use crate::types::Phase;

/// TX/RX indicator pair
pub struct PhaseIndicators<P> {
    tx: P,
    rx: P,
    lit: Option<Phase>,
}

impl<P: OutputPin> PhaseIndicators<P> {
    /// Wrap the two outputs (assumed off)
    #[must_use]
    pub fn new(tx: P, rx: P) -> Self {
        Self { tx, rx, lit: None }
    }

    /// Light exactly the indicator for `phase`
    ///
    /// The other indicator is switched off first so both are never lit.
    ///
    /// # Errors
    ///
    /// Propagates the pin error; the lit state is then unknown.
    pub fn show(&mut self, phase: Phase) -> Result<(), P::Error> {
        self.lit = None;
        match phase {
            Phase::Tx => {
                self.rx.set_low()?;
                self.tx.set_high()?;
            }
            Phase::Rx => {
                self.tx.set_low()?;
                self.rx.set_high()?;
            }
        }
        self.lit = Some(phase);
        Ok(())
    }

    /// Switch both indicators off
    ///
    /// # Errors
    ///
    /// Propagates the pin error.
    pub fn off(&mut self) -> Result<(), P::Error> {
        self.lit = None;
        self.tx.set_low()?;
        self.rx.set_low()
    }

    /// Phase currently shown
    #[must_use]
    pub const fn lit(&self) -> Option<Phase> {
        self.lit
    }
}
