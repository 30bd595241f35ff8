//! In-process radio
//!
//! Stands in for a Bluetooth adapter on hosts without a peripheral stack and
//! in tests. The same [`VirtualRadio`] handle is shared between the control
//! thread (as the backend) and the operator form (as a simulated central).

use crate::domain::advertising::{AdvertisingData, AdvertisingParameters};
use crate::domain::catalog::{BleUuid, CharacteristicProperties, ServiceDescriptor};
use crate::domain::error::{Result, SimulatorError};
use crate::domain::peripheral::{
    LiveCharacteristic, LiveService, PeripheralBackend, PeripheralController, TransportEvent,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Snapshot of one published service as a central would discover it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirService {
    pub identity: BleUuid,
    pub characteristics: Vec<AirCharacteristic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirCharacteristic {
    pub identity: BleUuid,
    pub properties: CharacteristicProperties,
    pub value: Vec<u8>,
}

#[derive(Debug)]
struct PublishedService {
    handle: u64,
    service: AirService,
}

#[derive(Debug, Default)]
struct RadioState {
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    controllers_created: usize,
    next_handle: u64,
    services: Vec<PublishedService>,
    advertisement: Option<AdvertisingData>,
    central: Option<String>,
}

impl RadioState {
    fn emit(&self, event: TransportEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn characteristic_mut(&mut self, handle: u64, identity: BleUuid) -> Option<&mut Vec<u8>> {
        self.services
            .iter_mut()
            .find(|s| s.handle == handle)?
            .service
            .characteristics
            .iter_mut()
            .find(|c| c.identity == identity)
            .map(|c| &mut c.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VirtualRadio {
    inner: Arc<Mutex<RadioState>>,
}

impl VirtualRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RadioState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn controllers_created(&self) -> usize {
        self.lock().controllers_created
    }

    pub fn is_advertising(&self) -> bool {
        self.lock().advertisement.is_some()
    }

    pub fn advertisement(&self) -> Option<AdvertisingData> {
        self.lock().advertisement.clone()
    }

    pub fn central(&self) -> Option<String> {
        self.lock().central.clone()
    }

    /// Identities of the published services in publication order
    #[cfg(test)]
    pub fn published_services(&self) -> Vec<BleUuid> {
        self.lock()
            .services
            .iter()
            .map(|s| s.service.identity)
            .collect()
    }

    pub fn air_view(&self) -> Vec<AirService> {
        self.lock()
            .services
            .iter()
            .map(|s| s.service.clone())
            .collect()
    }

    /// Read a characteristic the way a connected central would
    #[cfg(test)]
    pub fn read(&self, identity: BleUuid) -> Option<Vec<u8>> {
        self.lock()
            .services
            .iter()
            .flat_map(|s| s.service.characteristics.iter())
            .find(|c| c.identity == identity)
            .map(|c| c.value.clone())
    }

    /// Attach a central. Only possible while advertising; the transport
    /// stops advertising once the link is up.
    pub fn connect_central(&self, address: &str) -> Result<()> {
        let mut state = self.lock();
        if state.advertisement.is_none() {
            return Err(SimulatorError::Transport(
                "peripheral is not advertising".to_string(),
            ));
        }
        if let Some(existing) = &state.central {
            return Err(SimulatorError::Transport(format!(
                "already connected to {}",
                existing
            )));
        }

        info!("Virtual central {} connecting", address);
        state.advertisement = None;
        state.central = Some(address.to_string());
        state.emit(TransportEvent::Connected(address.to_string()));
        Ok(())
    }

    pub fn disconnect_central(&self) -> Result<()> {
        let mut state = self.lock();
        match state.central.take() {
            Some(address) => {
                info!("Virtual central {} disconnecting", address);
                state.emit(TransportEvent::Disconnected);
                Ok(())
            }
            None => Err(SimulatorError::Transport("no central connected".to_string())),
        }
    }
}

impl PeripheralBackend for VirtualRadio {
    type Controller = VirtualController;

    async fn create_peripheral(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<VirtualController> {
        let mut state = self.lock();
        state.events = Some(events);
        state.controllers_created += 1;
        debug!("Virtual controller #{} created", state.controllers_created);
        Ok(VirtualController {
            radio: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct VirtualController {
    radio: VirtualRadio,
}

impl PeripheralController for VirtualController {
    type Service = VirtualService;

    async fn add_service(&mut self, descriptor: &ServiceDescriptor) -> Result<VirtualService> {
        let mut state = self.radio.lock();
        let handle = state.next_handle;
        state.next_handle += 1;
        state.services.push(PublishedService {
            handle,
            service: AirService {
                identity: descriptor.identity,
                characteristics: descriptor
                    .characteristics
                    .iter()
                    .map(|c| AirCharacteristic {
                        identity: c.identity,
                        properties: c.properties,
                        value: c.value.clone(),
                    })
                    .collect(),
            },
        });

        Ok(VirtualService {
            radio: self.radio.clone(),
            handle,
        })
    }

    async fn start_advertising(
        &mut self,
        parameters: &AdvertisingParameters,
        data: &AdvertisingData,
    ) -> Result<()> {
        debug!("Advertising {:?} with {:?}", parameters.mode, data);
        self.radio.lock().advertisement = Some(data.clone());
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<()> {
        self.radio.lock().advertisement = None;
        Ok(())
    }
}

/// Published service; dropping it removes the service from the air
#[derive(Debug)]
pub struct VirtualService {
    radio: VirtualRadio,
    handle: u64,
}

impl LiveService for VirtualService {
    type Characteristic = VirtualCharacteristic;

    fn characteristic(&self, identity: BleUuid) -> Option<VirtualCharacteristic> {
        let mut state = self.radio.lock();
        state.characteristic_mut(self.handle, identity)?;
        Some(VirtualCharacteristic {
            radio: self.radio.clone(),
            handle: self.handle,
            identity,
        })
    }
}

impl Drop for VirtualService {
    fn drop(&mut self) {
        let handle = self.handle;
        self.radio.lock().services.retain(|s| s.handle != handle);
    }
}

#[derive(Debug, Clone)]
pub struct VirtualCharacteristic {
    radio: VirtualRadio,
    handle: u64,
    identity: BleUuid,
}

impl LiveCharacteristic for VirtualCharacteristic {
    fn value(&self) -> Vec<u8> {
        self.radio
            .lock()
            .characteristic_mut(self.handle, self.identity)
            .map(|value| value.clone())
            .unwrap_or_default()
    }

    async fn write(&self, value: &[u8]) -> Result<()> {
        let mut state = self.radio.lock();
        let slot = state
            .characteristic_mut(self.handle, self.identity)
            .ok_or_else(|| {
                SimulatorError::Transport(format!("{} is no longer published", self.identity))
            })?;
        *slot = value.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{build_service, uuids, ServiceKind};
    use crate::domain::value_store::ValueStore;

    #[tokio::test]
    async fn test_central_needs_advertising() {
        let radio = VirtualRadio::new();
        assert!(radio.connect_central("AA:BB:CC:DD:EE:FF").is_err());
        assert!(radio.disconnect_central().is_err());
    }

    #[tokio::test]
    async fn test_connect_stops_advertising_and_reports() {
        let radio = VirtualRadio::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = radio.create_peripheral(tx).await.unwrap();
        let data = AdvertisingData::for_serial_number("1").unwrap();
        controller
            .start_advertising(&AdvertisingParameters::default(), &data)
            .await
            .unwrap();

        radio.connect_central("AA:BB:CC:DD:EE:FF").unwrap();
        assert!(!radio.is_advertising());
        assert_eq!(radio.central().as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Connected("AA:BB:CC:DD:EE:FF".to_string()))
        );

        radio.disconnect_central().unwrap();
        assert_eq!(rx.recv().await, Some(TransportEvent::Disconnected));
        assert_eq!(radio.central(), None);
    }

    #[tokio::test]
    async fn test_dropping_service_unpublishes() {
        let radio = VirtualRadio::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = radio.create_peripheral(tx).await.unwrap();
        let descriptor = build_service(ServiceKind::XleSetup, &ValueStore::default());

        let service = controller.add_service(&descriptor).await.unwrap();
        let characteristic = service.characteristic(uuids::SIM_ICCID).unwrap();
        assert_eq!(characteristic.value(), b"0".to_vec());
        assert!(service.characteristic(uuids::SYSTEM_ID).is_none());

        let air = radio.air_view();
        assert_eq!(air[0].characteristics.len(), 7);
        assert!(air[0]
            .characteristics
            .iter()
            .all(|c| c.properties == CharacteristicProperties::READ));

        drop(service);
        assert!(radio.air_view().is_empty());
        assert!(characteristic.write(b"1").await.is_err());
    }
}
