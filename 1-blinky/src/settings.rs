use std::env;
use std::time::Duration;

use crate::error::SettingsError;

pub const PIN_VAR: &str = "BLINKY_PIN";
pub const INTERVAL_VAR: &str = "BLINKY_INTERVAL_MS";

const DEFAULT_PIN: &str = "BCM6";
const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkSettings {
    /// Name of the output line, as understood by the peripheral manager.
    pub pin: String,
    /// Time between two consecutive toggles. The first toggle also waits
    /// this long after start.
    pub interval: Duration,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_owned(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl BlinkSettings {
    /// Defaults overridden by `BLINKY_PIN` and `BLINKY_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(env::var(PIN_VAR).ok(), env::var(INTERVAL_VAR).ok())
    }

    fn from_vars(pin: Option<String>, interval_ms: Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(pin) = pin {
            let pin = pin.trim();
            if pin.is_empty() {
                return Err(SettingsError::EmptyPin { var: PIN_VAR });
            }
            settings.pin = pin.to_owned();
        }

        if let Some(value) = interval_ms {
            let millis: u64 =
                value
                    .trim()
                    .parse()
                    .map_err(|_| SettingsError::InvalidInterval {
                        var: INTERVAL_VAR,
                        value: value.clone(),
                    })?;
            if millis == 0 {
                return Err(SettingsError::ZeroInterval { var: INTERVAL_VAR });
            }
            settings.interval = Duration::from_millis(millis);
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_led_wiring() {
        let settings = BlinkSettings::from_vars(None, None).unwrap();
        assert_eq!(settings.pin, "BCM6");
        assert_eq!(settings.interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides_pin_and_interval() {
        let settings =
            BlinkSettings::from_vars(Some(" BCM13 ".into()), Some("250".into())).unwrap();
        assert_eq!(settings.pin, "BCM13");
        assert_eq!(settings.interval, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            BlinkSettings::from_vars(Some("".into()), None),
            Err(SettingsError::EmptyPin { var: PIN_VAR })
        );
        assert_eq!(
            BlinkSettings::from_vars(None, Some("fast".into())),
            Err(SettingsError::InvalidInterval {
                var: INTERVAL_VAR,
                value: "fast".into()
            })
        );
        assert_eq!(
            BlinkSettings::from_vars(None, Some("0".into())),
            Err(SettingsError::ZeroInterval { var: INTERVAL_VAR })
        );
    }
}
