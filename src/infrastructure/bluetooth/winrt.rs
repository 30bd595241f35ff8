//! Windows Peripheral Backend
//!
//! Publishes each service through its own `GattServiceProvider` and the
//! manufacturer data through a `BluetoothLEAdvertisementPublisher`. Reads
//! are answered from the last written value.
//!
//! WinRT has no peripheral-side connect callback, so the first GATT request
//! of a new session is reported as the central connecting and the session
//! closing as it disconnecting.

use crate::domain::advertising::{AdvertisingData, AdvertisingParameters};
use crate::domain::catalog::{BleUuid, CharacteristicSpec, ServiceDescriptor};
use crate::domain::error::{Result, SimulatorError};
use crate::domain::peripheral::{
    LiveCharacteristic, LiveService, PeripheralBackend, PeripheralController, TransportEvent,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use windows::core::{Ref, GUID, HSTRING};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementPublisher, BluetoothLEManufacturerData,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristicProperties, GattLocalCharacteristic, GattLocalCharacteristicParameters,
    GattProtectionLevel, GattReadRequestedEventArgs, GattServiceProvider,
    GattServiceProviderAdvertisingParameters, GattSession, GattSessionStatus,
    GattSessionStatusChangedEventArgs,
};
use windows::Devices::Bluetooth::{BluetoothError, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::{DataWriter, IBuffer};

fn transport(e: windows::core::Error) -> SimulatorError {
    SimulatorError::Transport(e.message().to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn guid(identity: BleUuid) -> GUID {
    GUID::from_u128(identity.to_uuid().as_u128())
}

fn buffer(bytes: &[u8]) -> windows::core::Result<IBuffer> {
    let writer = DataWriter::new()?;
    writer.WriteBytes(bytes)?;
    writer.DetachBuffer()
}

fn format_address(address: u64) -> String {
    address.to_be_bytes()[2..]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Tracks the GATT session of the attached central
struct LinkTracker {
    events: mpsc::UnboundedSender<TransportEvent>,
    session: Mutex<Option<(HSTRING, GattSession)>>,
}

impl LinkTracker {
    /// Called for every GATT request; reports a connect the first time a
    /// session is seen
    fn observe(self: &Arc<Self>, session: GattSession) -> windows::core::Result<()> {
        let device_id = session.DeviceId()?.Id()?;
        {
            let mut current = lock(&self.session);
            if matches!(&*current, Some((id, _)) if *id == device_id) {
                return Ok(());
            }
            *current = Some((device_id.clone(), session.clone()));
        }

        let tracker = Arc::clone(self);
        session.SessionStatusChanged(&TypedEventHandler::new(
            move |_: Ref<GattSession>, args: Ref<GattSessionStatusChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    if args.Status()? == GattSessionStatus::Closed {
                        tracker.closed();
                    }
                }
                Ok(())
            },
        ))?;

        let address = BluetoothLEDevice::FromIdAsync(&device_id)?
            .get()?
            .BluetoothAddress()?;
        let _ = self
            .events
            .send(TransportEvent::Connected(format_address(address)));
        Ok(())
    }

    fn closed(&self) {
        if lock(&self.session).take().is_some() {
            let _ = self.events.send(TransportEvent::Disconnected);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WinRtRadio;

impl WinRtRadio {
    pub fn new() -> Self {
        Self
    }
}

impl PeripheralBackend for WinRtRadio {
    type Controller = WinRtController;

    async fn create_peripheral(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<WinRtController> {
        let publisher = BluetoothLEAdvertisementPublisher::new().map_err(transport)?;
        info!("WinRT peripheral created");
        Ok(WinRtController {
            tracker: Arc::new(LinkTracker {
                events,
                session: Mutex::new(None),
            }),
            providers: Arc::new(Mutex::new(Vec::new())),
            publisher,
        })
    }
}

pub struct WinRtController {
    tracker: Arc<LinkTracker>,
    providers: Arc<Mutex<Vec<(BleUuid, GattServiceProvider)>>>,
    publisher: BluetoothLEAdvertisementPublisher,
}

impl WinRtController {
    async fn create_characteristic(
        &self,
        provider: &GattServiceProvider,
        spec: &CharacteristicSpec,
    ) -> Result<WinRtCharacteristic> {
        let parameters = GattLocalCharacteristicParameters::new().map_err(transport)?;
        parameters
            .SetCharacteristicProperties(GattCharacteristicProperties(
                spec.properties.bits() as u32
            ))
            .map_err(transport)?;
        parameters
            .SetReadProtectionLevel(GattProtectionLevel::Plain)
            .map_err(transport)?;

        let result = provider
            .Service()
            .and_then(|service| service.CreateCharacteristicAsync(guid(spec.identity), &parameters))
            .map_err(transport)?
            .await
            .map_err(transport)?;
        if result.Error().map_err(transport)? != BluetoothError::Success {
            return Err(SimulatorError::Transport(format!(
                "creating characteristic {} failed: {:?}",
                spec.identity,
                result.Error()
            )));
        }
        let local = result.Characteristic().map_err(transport)?;

        let value = Arc::new(Mutex::new(spec.value.clone()));
        let read_value = Arc::clone(&value);
        let tracker = Arc::clone(&self.tracker);
        local
            .ReadRequested(&TypedEventHandler::new(
                move |_: Ref<GattLocalCharacteristic>, args: Ref<GattReadRequestedEventArgs>| {
                    let Some(args) = args.as_ref() else {
                        return Ok(());
                    };
                    if let Err(e) = tracker.observe(args.Session()?) {
                        warn!("Could not track GATT session: {}", e.message());
                    }

                    let deferral = args.GetDeferral()?;
                    let request = args.GetRequestAsync()?.get()?;
                    let bytes = lock(&read_value).clone();
                    request.RespondWithValue(&buffer(&bytes)?)?;
                    deferral.Complete()
                },
            ))
            .map_err(transport)?;

        Ok(WinRtCharacteristic {
            identity: spec.identity,
            local,
            value,
        })
    }

    fn advertising_parameters(
        discoverable: bool,
    ) -> windows::core::Result<GattServiceProviderAdvertisingParameters> {
        let parameters = GattServiceProviderAdvertisingParameters::new()?;
        parameters.SetIsConnectable(true)?;
        parameters.SetIsDiscoverable(discoverable)?;
        Ok(parameters)
    }
}

impl PeripheralController for WinRtController {
    type Service = WinRtService;

    async fn add_service(&mut self, descriptor: &ServiceDescriptor) -> Result<WinRtService> {
        let result = GattServiceProvider::CreateAsync(guid(descriptor.identity))
            .map_err(transport)?
            .await
            .map_err(transport)?;
        if result.Error().map_err(transport)? != BluetoothError::Success {
            return Err(SimulatorError::Transport(format!(
                "creating service {} failed: {:?}",
                descriptor.identity,
                result.Error()
            )));
        }
        let provider = result.ServiceProvider().map_err(transport)?;

        let mut characteristics = Vec::with_capacity(descriptor.characteristics.len());
        for spec in &descriptor.characteristics {
            characteristics.push(self.create_characteristic(&provider, spec).await?);
        }

        lock(&self.providers).push((descriptor.identity, provider.clone()));
        debug!(
            "Service {} ready with {} characteristics",
            descriptor.identity,
            characteristics.len()
        );

        Ok(WinRtService {
            provider,
            providers: Arc::clone(&self.providers),
            characteristics,
        })
    }

    async fn start_advertising(
        &mut self,
        parameters: &AdvertisingParameters,
        data: &AdvertisingData,
    ) -> Result<()> {
        debug!("Advertising {:?} with {:?}", parameters.mode, data);

        for (identity, provider) in lock(&self.providers).iter() {
            let discoverable = data.service_uuids.contains(identity);
            Self::advertising_parameters(discoverable)
                .and_then(|p| provider.StartAdvertisingWithParameters(&p))
                .map_err(transport)?;
        }

        let advertisement = self.publisher.Advertisement().map_err(transport)?;
        // Windows writes the flags field itself (general discoverable)
        let manufacturer = advertisement.ManufacturerData().map_err(transport)?;
        manufacturer.Clear().map_err(transport)?;
        if let Some(md) = &data.manufacturer_data {
            let entry = buffer(&md.data)
                .and_then(|b| BluetoothLEManufacturerData::Create(md.company_id, &b))
                .map_err(transport)?;
            manufacturer.Append(&entry).map_err(transport)?;
        }
        self.publisher.Start().map_err(transport)?;
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<()> {
        for (_, provider) in lock(&self.providers).iter() {
            provider.StopAdvertising().map_err(transport)?;
        }
        self.publisher.Stop().map_err(transport)?;
        Ok(())
    }
}

/// Published service; dropping it withdraws the provider
pub struct WinRtService {
    provider: GattServiceProvider,
    providers: Arc<Mutex<Vec<(BleUuid, GattServiceProvider)>>>,
    characteristics: Vec<WinRtCharacteristic>,
}

impl LiveService for WinRtService {
    type Characteristic = WinRtCharacteristic;

    fn characteristic(&self, identity: BleUuid) -> Option<WinRtCharacteristic> {
        self.characteristics
            .iter()
            .find(|c| c.identity == identity)
            .cloned()
    }
}

impl Drop for WinRtService {
    fn drop(&mut self) {
        let _ = self.provider.StopAdvertising();
        lock(&self.providers).retain(|(_, p)| *p != self.provider);
    }
}

#[derive(Clone)]
pub struct WinRtCharacteristic {
    identity: BleUuid,
    local: GattLocalCharacteristic,
    value: Arc<Mutex<Vec<u8>>>,
}

impl LiveCharacteristic for WinRtCharacteristic {
    fn value(&self) -> Vec<u8> {
        lock(&self.value).clone()
    }

    async fn write(&self, value: &[u8]) -> Result<()> {
        *lock(&self.value) = value.to_vec();

        let subscribed = self
            .local
            .SubscribedClients()
            .and_then(|clients| clients.Size())
            .map_err(transport)?;
        if subscribed > 0 {
            let payload = buffer(value).map_err(transport)?;
            self.local
                .NotifyValueAsync(&payload)
                .map_err(transport)?
                .await
                .map_err(transport)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_formatting() {
        assert_eq!(format_address(0x0000_a1b2_c3d4_e5f6), "A1:B2:C3:D4:E5:F6");
    }
}
