use thiserror::Error;

/// Failure to acquire a digital output from a [`PeripheralManager`].
///
/// [`PeripheralManager`]: crate::peripheral::PeripheralManager
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("digital output {0} not found")]
    NotFound(String),

    #[error("digital output {0} is already in use")]
    AlreadyInUse(String),

    #[error("permission denied opening {name}: {reason}")]
    PermissionDenied { name: String, reason: String },

    #[error("peripheral service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("digital output {0} is closed")]
    Closed(String),

    #[error("failed to drive digital output {pin}: {reason}")]
    Write { pin: String, reason: String },
}

/// Misuse of [`BlinkController::start`](crate::controller::BlinkController::start).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("controller is already running")]
    AlreadyRunning,

    #[error("digital output has been released")]
    ClosedHandle,

    #[error("toggle interval must be greater than zero")]
    ZeroInterval,
}

/// Reported on the fault channel when a toggle fails. The controller has
/// already stopped and released its output by the time this is received.
#[derive(Debug, Error)]
#[error("toggle #{} on {pin} failed", .toggles + 1)]
pub struct ToggleFault {
    pub pin: String,
    /// Successful toggles before the failing one.
    pub toggles: u64,
    #[source]
    pub source: OutputError,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{var} must not be empty")]
    EmptyPin { var: &'static str },

    #[error("{var}={value} is not a number of milliseconds")]
    InvalidInterval { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    ZeroInterval { var: &'static str },
}
