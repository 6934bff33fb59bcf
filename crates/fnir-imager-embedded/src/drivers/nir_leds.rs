//! NIR LED bank
//!
//! Eight GPIO outputs drive four dual-wavelength LED groups directly:
//!
//! ```text
//! output:  0      1      2      3      4      5      6      7
//! group:   0      0      1      1      2      2      3      3
//! LED:     730nm  850nm  730nm  850nm  730nm  850nm  730nm  850nm
//! ```
//!
//! At most one output is high at a time.

use embedded_hal::digital::OutputPin;

use fnir_imager_core::types::{Illuminant, LedGroup};

use crate::scan::Illuminator;

/// Number of LED outputs
pub const LED_OUTPUTS: usize = 8;

/// Output index for an illuminant on a group, `None` when dark
#[must_use]
pub const fn output_index(illuminant: Illuminant, group: LedGroup) -> Option<usize> {
    let base = group.index() as usize * 2;
    match illuminant {
        Illuminant::Nm730 => Some(base),
        Illuminant::Nm850 => Some(base + 1),
        Illuminant::Off => None,
    }
}

/// GPIO-driven NIR LED bank
pub struct GpioIlluminator<P> {
    outputs: [P; LED_OUTPUTS],
    lit: Option<usize>,
}

impl<P, E> GpioIlluminator<P>
where
    P: OutputPin<Error = E>,
{
    /// Create a bank from its eight outputs, in board order
    #[must_use]
    pub fn new(outputs: [P; LED_OUTPUTS]) -> Self {
        Self { outputs, lit: None }
    }

    /// Output currently driven high
    #[must_use]
    pub fn lit(&self) -> Option<usize> {
        self.lit
    }

    fn drive(&mut self, lit: Option<usize>) -> Result<(), E> {
        // Everything else low first so two LEDs are never on together
        for (i, output) in self.outputs.iter_mut().enumerate() {
            if Some(i) != lit {
                output.set_low()?;
            }
        }
        self.lit = None;

        if let Some(i) = lit {
            self.outputs[i].set_high()?;
            self.lit = Some(i);
        }
        Ok(())
    }
}

impl<P, E> Illuminator for GpioIlluminator<P>
where
    P: OutputPin<Error = E>,
{
    type Error = E;

    fn select(&mut self, illuminant: Illuminant, group: LedGroup) -> Result<(), E> {
        self.drive(output_index(illuminant, group))
    }

    fn all_off(&mut self) -> Result<(), E> {
        self.drive(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
