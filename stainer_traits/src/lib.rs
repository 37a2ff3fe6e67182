pub mod clock;
pub mod counter;

pub use clock::{Clock, MonotonicClock, VirtualClock};
pub use counter::StepCounter;

/// Physical pin number as wired on the controller board.
pub type PinId = u8;

/// Digital I/O surface the controller drives: limit switches in, motor
/// enables/directions/steps, relays, solenoids and the status LED out.
///
/// `true` is a high level. Switch polarity is resolved by the caller.
pub trait DigitalIo {
    fn read_pin(&mut self, pin: PinId) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn write_pin(
        &mut self,
        pin: PinId,
        high: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: DigitalIo + ?Sized> DigitalIo for Box<T> {
    fn read_pin(&mut self, pin: PinId) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_pin(pin)
    }
    fn write_pin(
        &mut self,
        pin: PinId,
        high: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_pin(pin, high)
    }
}
