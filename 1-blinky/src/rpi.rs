//! Raspberry Pi GPIO through `rppal`.

use std::ops::RangeInclusive;

use log::debug;
use rppal::gpio::{self, Gpio, OutputPin};

use crate::error::{OpenError, OutputError};
use crate::peripheral::{DigitalOutput, Level, PeripheralManager};

/// BCM numbers routed to the 40-pin header.
const HEADER_PINS: RangeInclusive<u8> = 0..=27;

pub struct RpiPeripheralManager {
    gpio: Gpio,
}

impl RpiPeripheralManager {
    pub fn new() -> Result<Self, OpenError> {
        let gpio = Gpio::new().map_err(|err| open_error("GPIO", err))?;
        Ok(Self { gpio })
    }
}

impl PeripheralManager for RpiPeripheralManager {
    type Output = RpiOutput;

    fn digital_output_names(&self) -> Vec<String> {
        HEADER_PINS.map(|pin| format!("BCM{pin}")).collect()
    }

    fn open_digital_output(&self, name: &str) -> Result<RpiOutput, OpenError> {
        let bcm = parse_pin(name)
            .filter(|pin| HEADER_PINS.contains(pin))
            .ok_or_else(|| OpenError::NotFound(name.to_owned()))?;

        let pin = self
            .gpio
            .get(bcm)
            .map_err(|err| open_error(name, err))?
            .into_output_low();
        debug!("Opened {name} as BCM {bcm}");

        Ok(RpiOutput {
            name: name.to_owned(),
            pin: Some(pin),
            level: Level::Low,
        })
    }
}

pub struct RpiOutput {
    name: String,
    pin: Option<OutputPin>,
    level: Level,
}

impl RpiOutput {
    fn pin_mut(&mut self) -> Result<&mut OutputPin, OutputError> {
        self.pin
            .as_mut()
            .ok_or_else(|| OutputError::Closed(self.name.clone()))
    }
}

impl DigitalOutput for RpiOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_initial_level(&mut self, level: Level) -> Result<(), OutputError> {
        self.write(level)
    }

    fn write(&mut self, level: Level) -> Result<(), OutputError> {
        let pin = self.pin_mut()?;
        match level {
            Level::Low => pin.set_low(),
            Level::High => pin.set_high(),
        }
        self.level = level;
        Ok(())
    }

    fn read(&self) -> Level {
        self.level
    }

    fn is_closed(&self) -> bool {
        self.pin.is_none()
    }

    fn close(&mut self) {
        if let Some(mut pin) = self.pin.take() {
            // the pin mode is reset when dropped
            pin.set_low();
            self.level = Level::Low;
            debug!("Released {}", self.name);
        }
    }
}

impl Drop for RpiOutput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Accepts `BCM6`, `GPIO6` or plain `6`, ignoring case.
fn parse_pin(name: &str) -> Option<u8> {
    let upper = name.trim().to_ascii_uppercase();
    let number = upper
        .strip_prefix("BCM")
        .or_else(|| upper.strip_prefix("GPIO"))
        .unwrap_or(&upper);
    number.parse().ok()
}

fn open_error(name: &str, err: gpio::Error) -> OpenError {
    match err {
        gpio::Error::PinUsed(_) => OpenError::AlreadyInUse(name.to_owned()),
        gpio::Error::PinNotAvailable(_) => OpenError::NotFound(name.to_owned()),
        gpio::Error::PermissionDenied(reason) => OpenError::PermissionDenied {
            name: name.to_owned(),
            reason,
        },
        other => OpenError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pin_names() {
        assert_eq!(parse_pin("BCM6"), Some(6));
        assert_eq!(parse_pin("gpio13"), Some(13));
        assert_eq!(parse_pin("27"), Some(27));
        assert_eq!(parse_pin("BCM"), None);
        assert_eq!(parse_pin("LED"), None);
    }

    #[test]
    fn maps_rppal_errors() {
        assert!(matches!(
            open_error("BCM6", gpio::Error::PinUsed(6)),
            OpenError::AlreadyInUse(_)
        ));
        assert!(matches!(
            open_error("BCM6", gpio::Error::PinNotAvailable(6)),
            OpenError::NotFound(_)
        ));
        assert!(matches!(
            open_error("BCM6", gpio::Error::PermissionDenied("/dev/gpiomem".into())),
            OpenError::PermissionDenied { .. }
        ));
    }
}
