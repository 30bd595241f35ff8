//! Advertising State Machine
//!
//! ```text
//!            start                connected(addr)
//!   Idle ────────────► Advertising ───────────────► Connected
//!    ▲                    │  ▲                          │
//!    │        stop        │  │   disconnected:          │
//!    └────────────────────┘  └── stop, then start ◄─────┘
//! ```
//!
//! The controller is created on the first start and kept for the rest of the
//! process. Services stay published across stop/start; every start pushes
//! the whole value store into them again.

use crate::domain::advertising::{AdvertisingData, AdvertisingParameters};
use crate::domain::catalog::CharacteristicId;
use crate::domain::error::Result;
use crate::domain::models::PeripheralState;
use crate::domain::peripheral::{PeripheralBackend, PeripheralController, TransportEvent};
use crate::domain::session::GattSession;
use crate::domain::value_store::ValueStore;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct AdvertisingStateMachine<B: PeripheralBackend> {
    backend: B,
    events: mpsc::UnboundedSender<TransportEvent>,
    session: Option<GattSession<B::Controller>>,
    state: PeripheralState,
    parameters: AdvertisingParameters,
    advertisement: Option<AdvertisingData>,
    remote_address: Option<String>,
}

impl<B: PeripheralBackend> AdvertisingStateMachine<B> {
    /// `events` is handed to the controller once it is created
    pub fn new(backend: B, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            backend,
            events,
            session: None,
            state: PeripheralState::Idle,
            parameters: AdvertisingParameters::default(),
            advertisement: None,
            remote_address: None,
        }
    }

    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn session(&self) -> Option<&GattSession<B::Controller>> {
        self.session.as_ref()
    }

    /// Advertisement currently on air, if any
    pub fn advertisement(&self) -> Option<&AdvertisingData> {
        self.advertisement.as_ref()
    }

    pub fn status_text(&self) -> String {
        match &self.remote_address {
            Some(address) => format!("Connected to {}", address),
            None => "Disconnected".to_string(),
        }
    }

    /// Idle → Advertising. Does nothing if already running.
    ///
    /// The advertisement is computed first so an invalid serial number
    /// leaves the controller and services untouched.
    pub async fn start(&mut self, store: &ValueStore) -> Result<()> {
        if self.state.is_running() {
            debug!("Start requested while {:?}, ignoring", self.state);
            return Ok(());
        }

        let data = AdvertisingData::for_serial_number(store.get(CharacteristicId::SerialNumber))?;

        let session = match self.session.take() {
            Some(session) => session,
            None => {
                info!("Creating peripheral controller");
                let controller = self.backend.create_peripheral(self.events.clone()).await?;
                GattSession::new(controller)
            }
        };
        let session = self.session.insert(session);

        session.ensure_services_published(store).await?;
        session.resynchronize(store).await?;
        session
            .controller_mut()
            .start_advertising(&self.parameters, &data)
            .await?;

        info!("Advertising started");
        self.advertisement = Some(data);
        self.state = PeripheralState::Advertising;
        Ok(())
    }

    /// Advertising|Connected → Idle. Services stay published.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.state.is_running() {
            debug!("Stop requested while idle, ignoring");
            return Ok(());
        }
        self.halt().await
    }

    async fn halt(&mut self) -> Result<()> {
        let stopped = match self.session.as_mut() {
            Some(session) => session.controller_mut().stop_advertising().await,
            None => Ok(()),
        };
        self.state = PeripheralState::Idle;
        self.advertisement = None;
        info!("Advertising stopped");
        stopped
    }

    /// Operator start/stop button
    pub async fn toggle(&mut self, store: &ValueStore) -> Result<()> {
        if self.state.is_running() {
            self.stop().await
        } else {
            self.start(store).await
        }
    }

    pub async fn on_transport_event(
        &mut self,
        event: TransportEvent,
        store: &ValueStore,
    ) -> Result<()> {
        match event {
            TransportEvent::Connected(address) => {
                info!("Central connected: {}", address);
                self.remote_address = Some(address);
                if self.state == PeripheralState::Advertising {
                    self.state = PeripheralState::Connected;
                    self.advertisement = None;
                } else {
                    warn!("Connect reported while {:?}", self.state);
                }
                Ok(())
            }
            TransportEvent::Disconnected => {
                info!("Central disconnected");
                self.remote_address = None;
                if self.session.is_none() {
                    warn!("Disconnect reported without a controller");
                    return Ok(());
                }
                // Restart even if the operator stopped advertising meanwhile
                self.halt().await?;
                self.start(store).await
            }
        }
    }

    /// Full reset: stop advertising, release the session and drop the
    /// controller.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.state = PeripheralState::Idle;
        self.advertisement = None;
        self.remote_address = None;
        match self.session.take() {
            Some(mut session) => session.release().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::uuids;
    use crate::domain::error::{SerialNumberError, SimulatorError};
    use crate::infrastructure::bluetooth::virtual_radio::VirtualRadio;

    fn machine(
        radio: &VirtualRadio,
    ) -> (
        AdvertisingStateMachine<VirtualRadio>,
        mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AdvertisingStateMachine::new(radio.clone(), tx), rx)
    }

    #[tokio::test]
    async fn test_start_publishes_and_advertises() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        let store = ValueStore::default();

        machine.start(&store).await.unwrap();

        assert_eq!(machine.state(), PeripheralState::Advertising);
        assert_eq!(machine.status_text(), "Disconnected");
        assert!(radio.is_advertising());
        let advertisement = radio.advertisement().unwrap();
        assert_eq!(
            advertisement.manufacturer_data.unwrap().data,
            vec![0x01, 0x03, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8]
        );
        assert_eq!(advertisement.service_uuids, vec![uuids::DEVICE_INFORMATION_SERVICE]);
        assert_eq!(radio.read(uuids::MANUFACTURER_NAME), Some(b"Anil Katragadda".to_vec()));
    }

    #[tokio::test]
    async fn test_invalid_serial_keeps_idle() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        let mut store = ValueStore::default();
        store.set(CharacteristicId::SerialNumber, "12a");

        let err = machine.start(&store).await.unwrap_err();

        assert!(matches!(
            err,
            SimulatorError::InvalidSerialNumber(SerialNumberError::InvalidDigit { ch: 'a' })
        ));
        assert_eq!(machine.state(), PeripheralState::Idle);
        assert_eq!(radio.controllers_created(), 0);
        assert!(radio.published_services().is_empty());
        assert!(!radio.is_advertising());
        assert!(machine.session().is_none());
    }

    #[tokio::test]
    async fn test_too_long_serial_keeps_idle() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        let mut store = ValueStore::default();
        store.set(CharacteristicId::SerialNumber, "8888888888888");

        assert!(machine.start(&store).await.is_err());
        assert_eq!(machine.state(), PeripheralState::Idle);
        assert_eq!(radio.controllers_created(), 0);
    }

    #[tokio::test]
    async fn test_controller_created_once_across_cycles() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        let store = ValueStore::default();

        machine.toggle(&store).await.unwrap();
        machine.toggle(&store).await.unwrap();
        assert_eq!(machine.state(), PeripheralState::Idle);
        assert!(!radio.is_advertising());
        assert_eq!(radio.published_services().len(), 2);

        machine.toggle(&store).await.unwrap();
        assert_eq!(machine.state(), PeripheralState::Advertising);
        assert_eq!(radio.controllers_created(), 1);
        assert_eq!(radio.published_services().len(), 2);
    }

    #[tokio::test]
    async fn test_restart_resynchronizes_values() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        let mut store = ValueStore::default();

        machine.start(&store).await.unwrap();
        machine.stop().await.unwrap();

        store.set(CharacteristicId::FirmwareRevision, "2.4.1");
        store.set(CharacteristicId::SerialNumber, "123");
        machine.start(&store).await.unwrap();

        assert_eq!(radio.read(uuids::FIRMWARE_REVISION), Some(b"2.4.1".to_vec()));
        assert_eq!(radio.read(uuids::SERIAL_NUMBER), Some(b"123".to_vec()));
        assert_eq!(
            radio.advertisement().unwrap().manufacturer_data.unwrap().data,
            vec![0x01, 0x03, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_connect_then_disconnect_restarts() {
        let radio = VirtualRadio::new();
        let (mut machine, mut rx) = machine(&radio);
        let store = ValueStore::default();
        machine.start(&store).await.unwrap();

        radio.connect_central("AA:BB:CC:DD:EE:FF").unwrap();
        let event = rx.recv().await.unwrap();
        machine.on_transport_event(event, &store).await.unwrap();

        assert_eq!(machine.state(), PeripheralState::Connected);
        assert_eq!(machine.status_text(), "Connected to AA:BB:CC:DD:EE:FF");
        assert!(!radio.is_advertising());

        radio.disconnect_central().unwrap();
        let event = rx.recv().await.unwrap();
        machine.on_transport_event(event, &store).await.unwrap();

        assert_eq!(machine.state(), PeripheralState::Advertising);
        assert_eq!(machine.status_text(), "Disconnected");
        assert!(radio.is_advertising());
        assert_eq!(radio.controllers_created(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_after_manual_stop_still_restarts() {
        let radio = VirtualRadio::new();
        let (mut machine, mut rx) = machine(&radio);
        let store = ValueStore::default();
        machine.start(&store).await.unwrap();
        radio.connect_central("11:22:33:44:55:66").unwrap();
        let event = rx.recv().await.unwrap();
        machine.on_transport_event(event, &store).await.unwrap();

        machine.stop().await.unwrap();
        assert_eq!(machine.state(), PeripheralState::Idle);

        machine
            .on_transport_event(TransportEvent::Disconnected, &store)
            .await
            .unwrap();
        assert_eq!(machine.state(), PeripheralState::Advertising);
    }

    #[tokio::test]
    async fn test_disconnect_without_controller_is_ignored() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);

        machine
            .on_transport_event(TransportEvent::Disconnected, &ValueStore::default())
            .await
            .unwrap();

        assert_eq!(machine.state(), PeripheralState::Idle);
        assert_eq!(radio.controllers_created(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_session() {
        let radio = VirtualRadio::new();
        let (mut machine, _rx) = machine(&radio);
        machine.start(&ValueStore::default()).await.unwrap();

        machine.shutdown().await.unwrap();

        assert_eq!(machine.state(), PeripheralState::Idle);
        assert!(machine.session().is_none());
        assert!(!radio.is_advertising());
        assert!(radio.published_services().is_empty());
    }
}
