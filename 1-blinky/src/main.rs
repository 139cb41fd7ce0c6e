mod logging;

use anyhow::Context;
use log::{debug, error, info};
use tokio::signal::ctrl_c;
use tokio::sync::mpsc;

use blinky::rpi::RpiPeripheralManager;
use blinky::{
    BlinkController, BlinkSettings, DigitalOutput, Level, PeripheralManager, TokioScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::initialize();
    info!("Controlling an LED from Rust");

    let settings = BlinkSettings::from_env()?;

    let manager = RpiPeripheralManager::new()?;
    for name in manager.digital_output_names() {
        debug!("GPIO pin name: {name}");
    }

    let mut led = manager
        .open_digital_output(&settings.pin)
        .with_context(|| format!("opening LED on {}", settings.pin))?;
    led.set_initial_level(Level::Low)?;

    let (faults_tx, mut faults_rx) = mpsc::unbounded_channel();
    let mut controller = BlinkController::new(led, settings.interval, TokioScheduler::current())
        .with_fault_channel(faults_tx);
    controller.start()?;

    let result: anyhow::Result<()> = tokio::select! {
        Some(fault) = faults_rx.recv() => {
            error!("LED stopped: {fault}");
            Err(fault.into())
        },
        result = ctrl_c() => result.map_err(Into::into),
    };

    info!(
        "Gracefully stopping {} ({:?} interval, {} toggles)",
        controller.pin(),
        controller.interval(),
        controller.toggles()
    );
    controller.stop();
    result
}
