pub mod controller;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod peripheral;
pub mod rpi;
pub mod scheduler;
pub mod settings;

pub use controller::BlinkController;
pub use error::{OpenError, OutputError, SettingsError, StartError, ToggleFault};
pub use peripheral::{DigitalOutput, Level, PeripheralManager};
pub use scheduler::{Scheduler, TokioScheduler};
pub use settings::BlinkSettings;
