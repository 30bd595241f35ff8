//! Advertising payload
//!
//! Builds the advertisement a central sees before connecting. The
//! manufacturer data carries the product id followed by the serial number
//! as one byte per decimal digit.
//!
//! ```text
//! company 0x07A3 | 0x01 0x03 | d0 d1 ... d11
//!                  product     serial digits (0..=9 each)
//! ```

use crate::domain::catalog::{uuids, BleUuid};
use crate::domain::error::SerialNumberError;

/// Manufacturer company identifier
pub const MANUFACTURER_COMPANY_ID: u16 = 0x07a3;

/// Product id prefix of the manufacturer data
pub const PRODUCT_ID: [u8; 2] = [0x01, 0x03];

pub const MAX_SERIAL_DIGITS: usize = 12;

/// Serial number in its advertised form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSerialNumber(Vec<u8>);

impl DeviceSerialNumber {
    /// Decode `text` as a sequence of single decimal digits
    pub fn parse(text: &str) -> Result<Self, SerialNumberError> {
        let len = text.chars().count();
        if len > MAX_SERIAL_DIGITS {
            return Err(SerialNumberError::TooLong {
                len,
                max: MAX_SERIAL_DIGITS,
            });
        }

        let digits = text
            .chars()
            .map(|ch| match u8::try_from(ch.to_ascii_lowercase()) {
                Ok(b) if b > b'9' => Err(SerialNumberError::InvalidDigit { ch }),
                Ok(b) if b >= b'0' => Ok(b - b'0'),
                // Below '0', or outside Latin-1 altogether
                _ => Err(SerialNumberError::NotADigit { ch }),
            })
            .collect::<Result<Vec<u8>, _>>()?;

        Ok(Self(digits))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discoverability {
    General,
}

/// Link layer advertising PDU type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingMode {
    /// ADV_IND
    ConnectableUndirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParameters {
    pub mode: AdvertisingMode,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        Self {
            mode: AdvertisingMode::ConnectableUndirected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingData {
    pub discoverability: Discoverability,
    pub service_uuids: Vec<BleUuid>,
    pub manufacturer_data: Option<ManufacturerData>,
}

impl AdvertisingData {
    /// Advertisement for a device with the given serial number text
    pub fn for_serial_number(serial_number: &str) -> Result<Self, SerialNumberError> {
        Ok(Self {
            discoverability: Discoverability::General,
            service_uuids: vec![uuids::DEVICE_INFORMATION_SERVICE],
            manufacturer_data: Some(ManufacturerData {
                company_id: MANUFACTURER_COMPANY_ID,
                data: manufacturer_payload(serial_number)?,
            }),
        })
    }
}

/// Product id followed by the decoded serial number
pub fn manufacturer_payload(serial_number: &str) -> Result<Vec<u8>, SerialNumberError> {
    let serial = DeviceSerialNumber::parse(serial_number)?;
    let mut payload = Vec::with_capacity(PRODUCT_ID.len() + serial.as_bytes().len());
    payload.extend_from_slice(&PRODUCT_ID);
    payload.extend_from_slice(serial.as_bytes());
    Ok(payload)
}
