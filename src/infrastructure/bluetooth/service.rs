//! Peripheral Service Module
//!
//! Runs the simulator on its own thread. Operator commands and transport
//! events are multiplexed onto a single task so every state change happens
//! in one place.

use crate::domain::error::SimulatorError;
use crate::domain::models::{AppEvent, MessageSeverity, SimulatorCommand, StatusMessage};
use crate::domain::peripheral::{PeripheralBackend, TransportEvent};
use crate::domain::simulator::Simulator;
use crate::domain::value_store::ValueStore;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct PeripheralService<B: PeripheralBackend> {
    simulator: Simulator<B>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<B: PeripheralBackend> PeripheralService<B> {
    pub fn new(backend: B, store: ValueStore, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        Self {
            simulator: Simulator::new(store, backend, transport_tx),
            transport_rx,
            event_sender,
        }
    }

    /// Process commands until `Shutdown` arrives or the UI goes away, then
    /// tear the peripheral down.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SimulatorCommand>) {
        info!("Peripheral control loop started");
        self.publish_state();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SimulatorCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }
            }
        }

        self.shutdown().await;
        info!("Peripheral control loop finished");
    }

    async fn handle_command(&mut self, command: SimulatorCommand) {
        match command {
            SimulatorCommand::ValueChanged(id, text) => {
                if let Err(e) = self.simulator.on_value_changed(id, text).await {
                    self.report_error(&format!("Updating {}", id.label()), e);
                }
            }
            SimulatorCommand::ToggleAdvertising => {
                let was_running = self.simulator.state().is_running();
                match self.simulator.on_advertise_toggle().await {
                    Ok(()) if was_running => {
                        self.send_log("Advertising stopped", MessageSeverity::Info)
                    }
                    Ok(()) => self.send_log("Advertising started", MessageSeverity::Success),
                    Err(e) => self.report_error("Starting advertisement", e),
                }
            }
            SimulatorCommand::Shutdown => self.shutdown().await,
        }
        self.publish_state();
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        if let Err(e) = self.simulator.on_transport_event(event).await {
            self.report_error("Handling link event", e);
        }
        self.publish_state();
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.simulator.shutdown().await {
            self.report_error("Releasing peripheral", e);
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        let machine = self.simulator.machine();
        let _ = self
            .event_sender
            .send(AppEvent::PeripheralState(machine.state()));
        let _ = self
            .event_sender
            .send(AppEvent::StatusText(machine.status_text()));
        let _ = self
            .event_sender
            .send(AppEvent::Advertisement(machine.advertisement().cloned()));
    }

    fn report_error(&self, context: &str, err: SimulatorError) {
        match err {
            SimulatorError::InvalidSerialNumber(reason) => {
                warn!("{}: {}", context, reason);
                let _ = self
                    .event_sender
                    .send(AppEvent::StartRejected(reason.to_string()));
            }
            err if err.is_programming_error() => {
                error!("{}: {}", context, err);
                debug_assert!(false, "{}: {}", context, err);
                self.send_log(&format!("{}: {}", context, err), MessageSeverity::Error);
            }
            err => {
                error!("{}: {}", context, err);
                self.send_log(&format!("{} failed: {}", context, err), MessageSeverity::Error);
            }
        }
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

/// Start the control thread. It owns the backend and the value store until
/// `Shutdown` is received or `commands` is closed.
pub fn spawn_control_thread<B>(
    backend: B,
    store: ValueStore,
    commands: mpsc::UnboundedReceiver<SimulatorCommand>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> std::io::Result<JoinHandle<()>>
where
    B: PeripheralBackend + Send + 'static,
{
    std::thread::Builder::new()
        .name("peripheral-control".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to create tokio runtime for the peripheral: {}", e);
                    let _ = events.send(AppEvent::LogMessage(StatusMessage {
                        message: format!("Peripheral unavailable: {}", e),
                        severity: MessageSeverity::Error,
                    }));
                    return;
                }
            };

            runtime.block_on(PeripheralService::new(backend, store, events).run(commands));
        })
}
