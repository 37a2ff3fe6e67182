//! Raspberry Pi GPIO backend.

use std::collections::HashMap;

use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use stainer_traits::{DigitalIo, PinId, StepCounter};
use tracing::{debug, trace};

use crate::InputBias;
use crate::error::{HwError, Result};

enum IoPin {
    Input(InputPin),
    Output(OutputPin),
}

/// Pins are claimed up front so a wiring mistake fails at startup rather
/// than in the middle of a pass.
pub struct GpioIo {
    pins: HashMap<PinId, IoPin>,
}

impl GpioIo {
    pub fn new(inputs: &[PinId], bias: InputBias, outputs: &[PinId]) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut pins = HashMap::new();
        for &n in inputs {
            let pin = gpio
                .get(n)
                .map_err(|e| HwError::Gpio(format!("input pin {n}: {e}")))?;
            let pin = match bias {
                InputBias::PullUp => pin.into_input_pullup(),
                InputBias::PullDown => pin.into_input_pulldown(),
            };
            pins.insert(n, IoPin::Input(pin));
        }
        for &n in outputs {
            if pins.contains_key(&n) {
                continue;
            }
            let mut pin = gpio
                .get(n)
                .map_err(|e| HwError::Gpio(format!("output pin {n}: {e}")))?
                .into_output();
            pin.set_low();
            pins.insert(n, IoPin::Output(pin));
        }
        debug!(inputs = inputs.len(), ?bias, outputs = outputs.len(), "gpio pins claimed");
        Ok(Self { pins })
    }
}

impl DigitalIo for GpioIo {
    fn read_pin(&mut self, pin: PinId) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        match self.pins.get(&pin) {
            Some(IoPin::Input(p)) => Ok(p.is_high()),
            Some(IoPin::Output(p)) => Ok(p.is_set_high()),
            None => Err(Box::new(HwError::UnknownPin(pin))),
        }
    }

    fn write_pin(
        &mut self,
        pin: PinId,
        high: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self.pins.get_mut(&pin) {
            Some(IoPin::Output(p)) => {
                p.write(if high { Level::High } else { Level::Low });
                Ok(())
            }
            Some(IoPin::Input(_)) => Err(Box::new(HwError::NotAnOutput(pin))),
            None => Err(Box::new(HwError::UnknownPin(pin))),
        }
    }
}

/// Feed rising edges on `pin` into `counter` from rppal's interrupt thread.
///
/// The returned pin must be kept alive; dropping it detaches the interrupt.
pub fn attach_pulse_counter(pin: PinId, counter: StepCounter) -> Result<InputPin> {
    let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
    let mut input = gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("pulse pin {pin}: {e}")))?
        .into_input();
    input
        .set_async_interrupt(Trigger::RisingEdge, move |_level: Level| {
            counter.pulse();
        })
        .map_err(|e| HwError::Gpio(format!("pulse interrupt on {pin}: {e}")))?;
    trace!(pin, "pulse counter attached");
    Ok(input)
}
