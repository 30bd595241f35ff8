//! Update propagation
//!
//! [`Simulator`] is the command surface the operator form drives: value
//! edits, the advertise toggle and transport events. It owns the value store
//! and the state machine exclusively.

use crate::domain::catalog::CharacteristicId;
use crate::domain::error::Result;
use crate::domain::models::PeripheralState;
use crate::domain::peripheral::{PeripheralBackend, TransportEvent};
use crate::domain::state_machine::AdvertisingStateMachine;
use crate::domain::value_store::ValueStore;
use tokio::sync::mpsc;
use tracing::debug;

pub struct Simulator<B: PeripheralBackend> {
    store: ValueStore,
    machine: AdvertisingStateMachine<B>,
}

impl<B: PeripheralBackend> Simulator<B> {
    pub fn new(
        store: ValueStore,
        backend: B,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            store,
            machine: AdvertisingStateMachine::new(backend, events),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn machine(&self) -> &AdvertisingStateMachine<B> {
        &self.machine
    }

    pub fn state(&self) -> PeripheralState {
        self.machine.state()
    }

    /// Record the new text, then write it to the air if a published session
    /// is currently advertising or connected. Otherwise the value waits for
    /// the next start's resync.
    pub async fn on_value_changed(&mut self, id: CharacteristicId, text: String) -> Result<()> {
        self.store.set(id, text);

        let session = match self.machine.session() {
            Some(session) if session.is_published() && self.machine.state().is_running() => {
                session
            }
            _ => {
                debug!("{} stored, write deferred until advertising", id.label());
                return Ok(());
            }
        };

        session
            .write_characteristic(id.service(), id.identity(), &self.store.encoded(id))
            .await
    }

    pub async fn on_advertise_toggle(&mut self) -> Result<()> {
        self.machine.toggle(&self.store).await
    }

    pub async fn on_transport_event(&mut self, event: TransportEvent) -> Result<()> {
        self.machine.on_transport_event(event, &self.store).await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.machine.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::uuids;
    use crate::infrastructure::bluetooth::virtual_radio::VirtualRadio;

    fn simulator(radio: &VirtualRadio) -> Simulator<VirtualRadio> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Simulator::new(ValueStore::default(), radio.clone(), tx)
    }

    #[tokio::test]
    async fn test_edit_while_idle_only_touches_store() {
        let radio = VirtualRadio::new();
        let mut sim = simulator(&radio);

        sim.on_value_changed(CharacteristicId::SystemId, "cafef00d".into())
            .await
            .unwrap();

        assert_eq!(sim.store().get(CharacteristicId::SystemId), "cafef00d");
        assert_eq!(radio.controllers_created(), 0);
        assert_eq!(radio.read(uuids::SYSTEM_ID), None);

        sim.on_advertise_toggle().await.unwrap();
        assert_eq!(radio.read(uuids::SYSTEM_ID), Some(b"cafef00d".to_vec()));
    }

    #[tokio::test]
    async fn test_edit_while_advertising_writes_immediately() {
        let radio = VirtualRadio::new();
        let mut sim = simulator(&radio);
        sim.on_advertise_toggle().await.unwrap();

        sim.on_value_changed(CharacteristicId::CellularSignalStrength, "-71".into())
            .await
            .unwrap();

        assert_eq!(
            radio.read(uuids::CELLULAR_SIGNAL_STRENGTH),
            Some(b"-71".to_vec())
        );
        assert_eq!(sim.state(), PeripheralState::Advertising);
    }

    #[tokio::test]
    async fn test_edit_while_connected_writes_immediately() {
        let radio = VirtualRadio::new();
        let mut sim = simulator(&radio);
        sim.on_advertise_toggle().await.unwrap();
        sim.on_transport_event(TransportEvent::Connected("AA:BB:CC:DD:EE:FF".into()))
            .await
            .unwrap();

        sim.on_value_changed(CharacteristicId::QrCode, "xfinity.other".into())
            .await
            .unwrap();

        assert_eq!(sim.state(), PeripheralState::Connected);
        assert_eq!(radio.read(uuids::QR_CODE), Some(b"xfinity.other".to_vec()));
    }

    #[tokio::test]
    async fn test_edit_after_stop_is_deferred_not_lost() {
        let radio = VirtualRadio::new();
        let mut sim = simulator(&radio);
        sim.on_advertise_toggle().await.unwrap();
        sim.on_advertise_toggle().await.unwrap();

        sim.on_value_changed(CharacteristicId::MeshBackhaulType, "2".into())
            .await
            .unwrap();
        assert_eq!(radio.read(uuids::MESH_BACKHAUL_TYPE), Some(b"0".to_vec()));

        sim.on_advertise_toggle().await.unwrap();
        assert_eq!(radio.read(uuids::MESH_BACKHAUL_TYPE), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_edit_is_kept_when_start_fails() {
        let radio = VirtualRadio::new();
        let mut sim = simulator(&radio);

        sim.on_value_changed(CharacteristicId::SerialNumber, "12a".into())
            .await
            .unwrap();
        assert!(sim.on_advertise_toggle().await.is_err());
        assert_eq!(sim.state(), PeripheralState::Idle);
        assert_eq!(sim.store().get(CharacteristicId::SerialNumber), "12a");

        sim.on_value_changed(CharacteristicId::SerialNumber, "12".into())
            .await
            .unwrap();
        sim.on_advertise_toggle().await.unwrap();
        assert_eq!(sim.state(), PeripheralState::Advertising);
        assert_eq!(radio.read(uuids::SERIAL_NUMBER), Some(b"12".to_vec()));
    }
}
