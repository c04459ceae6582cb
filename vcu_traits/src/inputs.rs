/// One synchronous reading of every driver-facing input.
///
/// ADC channels are raw converter counts (10-bit on the reference board, so
/// 0..=1023); `start_button` is already debounced by the acquisition layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSample {
    /// Accelerator position sensor on the 5 V divider.
    pub apps_5v: u16,
    /// Redundant accelerator position sensor on the 3.3 V divider.
    pub apps_3v3: u16,
    /// Brake pressure transducer.
    pub brake: u16,
    /// Hall-effect wheel speed sensor.
    pub hall: u16,
    pub start_button: bool,
}

/// Driver-input acquisition: pedals, brake, wheel speed, start button.
///
/// `sample` is called once per control tick and must not block.
pub trait Inputs {
    fn sample(&mut self) -> Result<InputSample, Box<dyn std::error::Error + Send + Sync>>;
}

impl<I: Inputs + ?Sized> Inputs for Box<I> {
    fn sample(&mut self) -> Result<InputSample, Box<dyn std::error::Error + Send + Sync>> {
        (**self).sample()
    }
}
