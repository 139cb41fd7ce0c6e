use std::fmt;
use std::ops::Not;

use crate::error::{OpenError, OutputError};

/// Logical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "LOW",
            Level::High => "HIGH",
        })
    }
}

/// Exclusive handle to one hardware output line.
///
/// The handle is created open by a [`PeripheralManager`] and stays usable
/// until [`close`](DigitalOutput::close) is called. Once closed, every
/// operation that drives the line fails with [`OutputError::Closed`].
pub trait DigitalOutput: Send + 'static {
    /// Platform-defined line name, e.g. `BCM6`.
    fn name(&self) -> &str;

    /// Drives the line to `level` before any toggling starts.
    fn set_initial_level(&mut self, level: Level) -> Result<(), OutputError>;

    fn write(&mut self, level: Level) -> Result<(), OutputError>;

    /// Last level written to the line.
    fn read(&self) -> Level;

    fn is_closed(&self) -> bool;

    /// Releases the line. Calling it again is a no-op.
    fn close(&mut self);
}

/// Host service granting exclusive access to output lines.
pub trait PeripheralManager {
    type Output: DigitalOutput;

    fn digital_output_names(&self) -> Vec<String>;

    fn open_digital_output(&self, name: &str) -> Result<Self::Output, OpenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_flips_level() {
        assert_eq!(!Level::Low, Level::High);
        assert_eq!(!Level::High, Level::Low);
    }

    #[test]
    fn converts_to_and_from_bool() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert!(bool::from(Level::High));
        assert!(!bool::from(Level::default()));
    }
}
