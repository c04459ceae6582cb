pub mod clock;
pub mod frame;
pub mod inputs;

pub use clock::{Clock, MonotonicClock};
pub use frame::CanFrame;
pub use inputs::{InputSample, Inputs};

/// One CAN controller attached to the VCU.
///
/// `receive` is non-blocking and safe to call from the receive pump at any
/// rate; `transmit` may fail when the transmit mailboxes are saturated.
pub trait CanBus {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>>;
    fn transmit(
        &mut self,
        frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<B: CanBus + ?Sized> CanBus for Box<B> {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).receive()
    }
    fn transmit(
        &mut self,
        frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).transmit(frame)
    }
}
