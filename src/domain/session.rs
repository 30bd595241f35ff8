//! GATT Session
//!
//! Owns the peripheral controller and the two published services for one
//! advertising episode. All characteristic writes go through here.

use crate::domain::catalog::{self, BleUuid, CharacteristicId, ServiceKind};
use crate::domain::error::{Result, SimulatorError};
use crate::domain::peripheral::{LiveCharacteristic, LiveService, PeripheralController};
use crate::domain::value_store::ValueStore;
use tracing::{debug, info};

pub struct GattSession<C: PeripheralController> {
    controller: C,
    device_information: Option<C::Service>,
    xle_setup: Option<C::Service>,
}

impl<C: PeripheralController> GattSession<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            device_information: None,
            xle_setup: None,
        }
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn is_published(&self) -> bool {
        self.device_information.is_some() && self.xle_setup.is_some()
    }

    fn service(&self, kind: ServiceKind) -> Option<&C::Service> {
        match kind {
            ServiceKind::DeviceInformation => self.device_information.as_ref(),
            ServiceKind::XleSetup => self.xle_setup.as_ref(),
        }
    }

    /// Add whichever of the two services is not on the controller yet.
    /// Calling this again once both are published does nothing.
    pub async fn ensure_services_published(&mut self, store: &ValueStore) -> Result<()> {
        if self.xle_setup.is_none() {
            let descriptor = catalog::build_service(ServiceKind::XleSetup, store);
            self.xle_setup = Some(self.controller.add_service(&descriptor).await?);
            info!("Published {} service {}", ServiceKind::XleSetup, descriptor.identity);
        }

        if self.device_information.is_none() {
            let descriptor = catalog::build_service(ServiceKind::DeviceInformation, store);
            self.device_information = Some(self.controller.add_service(&descriptor).await?);
            info!(
                "Published {} service {}",
                ServiceKind::DeviceInformation,
                descriptor.identity
            );
        }

        Ok(())
    }

    fn live_characteristic(
        &self,
        kind: ServiceKind,
        identity: BleUuid,
    ) -> Result<<C::Service as LiveService>::Characteristic> {
        let service = self
            .service(kind)
            .ok_or(SimulatorError::NotPublished(kind))?;
        service
            .characteristic(identity)
            .ok_or(SimulatorError::UnknownCharacteristic {
                service: kind,
                identity,
            })
    }

    pub async fn write_characteristic(
        &self,
        kind: ServiceKind,
        identity: BleUuid,
        value: &[u8],
    ) -> Result<()> {
        let characteristic = self.live_characteristic(kind, identity)?;
        characteristic.write(value).await?;
        debug!("{} {} <- {:02X?}", kind, identity, value);
        Ok(())
    }

    pub fn read_characteristic(&self, kind: ServiceKind, identity: BleUuid) -> Result<Vec<u8>> {
        Ok(self.live_characteristic(kind, identity)?.value())
    }

    /// Push every store value into its live characteristic. Values already
    /// on air are left alone.
    pub async fn resynchronize(&self, store: &ValueStore) -> Result<()> {
        let mut written = 0;
        for id in CharacteristicId::ALL {
            let value = store.encoded(id);
            if self.read_characteristic(id.service(), id.identity())? == value {
                continue;
            }
            self.write_characteristic(id.service(), id.identity(), &value)
                .await?;
            written += 1;
        }
        debug!("Resynchronized {} characteristics", written);
        Ok(())
    }

    /// Stop advertising and drop both service handles. The controller is
    /// kept; publish again before the next write.
    pub async fn release(&mut self) -> Result<()> {
        let stopped = self.controller.stop_advertising().await;
        self.xle_setup = None;
        self.device_information = None;
        info!("GATT session released");
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::uuids;
    use crate::domain::peripheral::PeripheralBackend;
    use crate::infrastructure::bluetooth::virtual_radio::VirtualRadio;
    use tokio::sync::mpsc;

    async fn session(radio: &VirtualRadio) -> GattSession<<VirtualRadio as PeripheralBackend>::Controller> {
        let (tx, _rx) = mpsc::unbounded_channel();
        GattSession::new(radio.create_peripheral(tx).await.unwrap())
    }

    #[tokio::test]
    async fn test_write_before_publish_fails() {
        let radio = VirtualRadio::new();
        let session = session(&radio).await;

        let err = session
            .write_characteristic(ServiceKind::DeviceInformation, uuids::SYSTEM_ID, b"x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::NotPublished(ServiceKind::DeviceInformation)
        ));
        assert!(err.is_programming_error());
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let radio = VirtualRadio::new();
        let mut session = session(&radio).await;
        let store = ValueStore::default();

        session.ensure_services_published(&store).await.unwrap();
        session.ensure_services_published(&store).await.unwrap();

        assert!(session.is_published());
        assert_eq!(
            radio.published_services(),
            vec![uuids::XLE_SETUP_SERVICE, uuids::DEVICE_INFORMATION_SERVICE]
        );
    }

    #[tokio::test]
    async fn test_unknown_characteristic() {
        let radio = VirtualRadio::new();
        let mut session = session(&radio).await;
        session
            .ensure_services_published(&ValueStore::default())
            .await
            .unwrap();

        let err = session
            .write_characteristic(ServiceKind::XleSetup, uuids::SERIAL_NUMBER, b"1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::UnknownCharacteristic {
                service: ServiceKind::XleSetup,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let radio = VirtualRadio::new();
        let mut session = session(&radio).await;
        session
            .ensure_services_published(&ValueStore::default())
            .await
            .unwrap();

        session
            .write_characteristic(ServiceKind::XleSetup, uuids::PROVISION_STATUS, b"1")
            .await
            .unwrap();

        assert_eq!(
            session
                .read_characteristic(ServiceKind::XleSetup, uuids::PROVISION_STATUS)
                .unwrap(),
            b"1".to_vec()
        );
        assert_eq!(radio.read(uuids::PROVISION_STATUS), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_resynchronize_brings_air_up_to_date() {
        let radio = VirtualRadio::new();
        let mut session = session(&radio).await;
        let mut store = ValueStore::default();
        session.ensure_services_published(&store).await.unwrap();

        store.set(CharacteristicId::ModemImei, "356938035643809");
        store.set(CharacteristicId::ModelNumber, "XLE-2");
        session.resynchronize(&store).await.unwrap();

        for id in CharacteristicId::ALL {
            assert_eq!(
                session.read_characteristic(id.service(), id.identity()).unwrap(),
                store.encoded(id),
                "{}",
                id.label()
            );
        }
        assert_eq!(radio.read(uuids::MODEM_IMEI), Some(b"356938035643809".to_vec()));
    }

    #[tokio::test]
    async fn test_release_requires_publishing_again() {
        let radio = VirtualRadio::new();
        let mut session = session(&radio).await;
        let store = ValueStore::default();
        session.ensure_services_published(&store).await.unwrap();

        session.release().await.unwrap();

        assert!(!session.is_published());
        assert!(radio.published_services().is_empty());
        assert!(session
            .write_characteristic(ServiceKind::XleSetup, uuids::QR_CODE, b"q")
            .await
            .is_err());

        session.ensure_services_published(&store).await.unwrap();
        assert!(session.is_published());
    }
}
