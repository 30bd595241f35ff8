//! Peripheral stack abstraction
//!
//! The simulator never touches a radio directly. A backend creates a
//! controller; the controller accepts services and advertises; a published
//! service hands out live characteristics. Link layer, pairing and
//! encryption all stay inside the backend.
//!
//! Connect and disconnect are reported asynchronously through the
//! [`TransportEvent`] sender given to [`PeripheralBackend::create_peripheral`].

use crate::domain::advertising::{AdvertisingData, AdvertisingParameters};
use crate::domain::catalog::{BleUuid, ServiceDescriptor};
use crate::domain::error::Result;
use tokio::sync::mpsc;

/// Link events raised by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A central attached; carries its address for display
    Connected(String),
    Disconnected,
}

#[allow(async_fn_in_trait)]
pub trait PeripheralBackend {
    type Controller: PeripheralController;

    async fn create_peripheral(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self::Controller>;
}

#[allow(async_fn_in_trait)]
pub trait PeripheralController {
    type Service: LiveService;

    /// Publish a service. The returned handle keeps it alive.
    async fn add_service(&mut self, descriptor: &ServiceDescriptor) -> Result<Self::Service>;

    async fn start_advertising(
        &mut self,
        parameters: &AdvertisingParameters,
        data: &AdvertisingData,
    ) -> Result<()>;

    async fn stop_advertising(&mut self) -> Result<()>;
}

pub trait LiveService {
    type Characteristic: LiveCharacteristic;

    fn characteristic(&self, identity: BleUuid) -> Option<Self::Characteristic>;
}

#[allow(async_fn_in_trait)]
pub trait LiveCharacteristic {
    /// Value a central would read right now
    fn value(&self) -> Vec<u8>;

    /// Replace the stored value. Subscribed centrals are notified by the
    /// backend if it supports it.
    async fn write(&self, value: &[u8]) -> Result<()>;
}
