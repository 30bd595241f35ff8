//! GATT Service Catalog
//!
//! Static definitions of the two services the simulator publishes: the
//! standard Device Information service and the vendor XLE setup service.
//! The catalog is well formed by construction; [`build_service`] never fails.

use crate::domain::value_store::ValueStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`.
/// SIG assigned 16-bit numbers are placed in bits 96..112.
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// A GATT attribute identity, either a SIG assigned 16-bit number or a
/// vendor specific 128-bit UUID.
///
/// Two identities compare equal when their expanded 128-bit forms match, so
/// `Sig16(0x2A23)` equals the vendor form of `00002a23-0000-1000-8000-00805f9b34fb`.
#[derive(Debug, Clone, Copy)]
pub enum BleUuid {
    Sig16(u16),
    Vendor128(Uuid),
}

impl BleUuid {
    pub const fn from_u128(value: u128) -> Self {
        Self::Vendor128(Uuid::from_u128(value))
    }

    /// Expand to the full 128-bit UUID
    pub fn to_uuid(&self) -> Uuid {
        match self {
            Self::Sig16(short) => Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(*short) << 96)),
            Self::Vendor128(uuid) => *uuid,
        }
    }
}

impl PartialEq for BleUuid {
    fn eq(&self, other: &Self) -> bool {
        self.to_uuid() == other.to_uuid()
    }
}

impl Eq for BleUuid {}

impl Hash for BleUuid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_uuid().hash(state);
    }
}

impl fmt::Display for BleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sig16(short) => write!(f, "0x{:04X}", short),
            Self::Vendor128(uuid) => write!(f, "{}", uuid.hyphenated()),
        }
    }
}

/// Service and characteristic identities
///
/// These must be reproduced exactly for the companion app to find them.
pub mod uuids {
    use super::BleUuid;

    /// Device Information service (SIG 0x180A)
    pub const DEVICE_INFORMATION_SERVICE: BleUuid = BleUuid::Sig16(0x180A);

    pub const SYSTEM_ID: BleUuid = BleUuid::Sig16(0x2A23);
    pub const MODEL_NUMBER: BleUuid = BleUuid::Sig16(0x2A24);
    pub const SERIAL_NUMBER: BleUuid = BleUuid::Sig16(0x2A25);
    pub const FIRMWARE_REVISION: BleUuid = BleUuid::Sig16(0x2A26);
    pub const HARDWARE_REVISION: BleUuid = BleUuid::Sig16(0x2A27);
    pub const SOFTWARE_REVISION: BleUuid = BleUuid::Sig16(0x2A28);
    pub const MANUFACTURER_NAME: BleUuid = BleUuid::Sig16(0x2A29);

    /// XLE setup service (primary)
    pub const XLE_SETUP_SERVICE: BleUuid =
        BleUuid::from_u128(0x01b073ea_24d3_4544_b88b_9525eaa29080);

    pub const QR_CODE: BleUuid = BleUuid::from_u128(0xe70b8154_f71c_4dea_854b_8a88ca05ae6e);
    pub const PROVISION_STATUS: BleUuid =
        BleUuid::from_u128(0x8c5310ee_73a7_4571_aee1_ca847c7e27c4);
    pub const SIM_ICCID: BleUuid = BleUuid::from_u128(0xf4c08d33_393f_486f_9bc5_0e7cc4dd6807);
    pub const MODEM_IMEI: BleUuid = BleUuid::from_u128(0xd1604db9_896e_487a_b81b_f79326c2caaf);
    pub const CELLULAR_SIGNAL_STRENGTH: BleUuid =
        BleUuid::from_u128(0x28ff0021_7dca_46ca_8526_64fdaed4b935);
    pub const MESH_BACKHAUL_TYPE: BleUuid =
        BleUuid::from_u128(0x83805d31_589f_4ca2_848b_219f60c15cdc);
    pub const WIFI_BACKHAUL_STATS: BleUuid =
        BleUuid::from_u128(0x4c3629ef_2865_40be_8ef0_48d6f6cf1915);
}

/// GATT characteristic property bits (Core spec Vol 3, Part G, 3.3.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    pub const READ: Self = Self(0x02);

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for CharacteristicProperties {
    fn default() -> Self {
        Self::READ
    }
}

/// The two published services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    DeviceInformation,
    XleSetup,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::DeviceInformation, ServiceKind::XleSetup];

    pub fn identity(self) -> BleUuid {
        match self {
            Self::DeviceInformation => uuids::DEVICE_INFORMATION_SERVICE,
            Self::XleSetup => uuids::XLE_SETUP_SERVICE,
        }
    }

    /// Heading used by the operator form
    pub fn title(self) -> &'static str {
        match self {
            Self::DeviceInformation => "Device Information",
            Self::XleSetup => "XLE Specifics",
        }
    }

    /// Characteristics of this service in publication order
    pub fn characteristics(self) -> &'static [CharacteristicId] {
        match self {
            Self::DeviceInformation => &CharacteristicId::ALL[..7],
            Self::XleSetup => &CharacteristicId::ALL[7..],
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Every operator editable characteristic.
///
/// Serialized by variant name so remembered values survive reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacteristicId {
    SystemId,
    ModelNumber,
    SerialNumber,
    FirmwareRevision,
    HardwareRevision,
    SoftwareRevision,
    ManufacturerName,
    QrCode,
    ProvisionStatus,
    SimIccid,
    ModemImei,
    CellularSignalStrength,
    MeshBackhaulType,
    WiFiBackhaulStats,
}

impl CharacteristicId {
    /// Device Information first, then XLE setup, each in publication order
    pub const ALL: [CharacteristicId; 14] = [
        Self::SystemId,
        Self::ModelNumber,
        Self::SerialNumber,
        Self::FirmwareRevision,
        Self::HardwareRevision,
        Self::SoftwareRevision,
        Self::ManufacturerName,
        Self::QrCode,
        Self::ProvisionStatus,
        Self::SimIccid,
        Self::ModemImei,
        Self::CellularSignalStrength,
        Self::MeshBackhaulType,
        Self::WiFiBackhaulStats,
    ];

    pub fn identity(self) -> BleUuid {
        match self {
            Self::SystemId => uuids::SYSTEM_ID,
            Self::ModelNumber => uuids::MODEL_NUMBER,
            Self::SerialNumber => uuids::SERIAL_NUMBER,
            Self::FirmwareRevision => uuids::FIRMWARE_REVISION,
            Self::HardwareRevision => uuids::HARDWARE_REVISION,
            Self::SoftwareRevision => uuids::SOFTWARE_REVISION,
            Self::ManufacturerName => uuids::MANUFACTURER_NAME,
            Self::QrCode => uuids::QR_CODE,
            Self::ProvisionStatus => uuids::PROVISION_STATUS,
            Self::SimIccid => uuids::SIM_ICCID,
            Self::ModemImei => uuids::MODEM_IMEI,
            Self::CellularSignalStrength => uuids::CELLULAR_SIGNAL_STRENGTH,
            Self::MeshBackhaulType => uuids::MESH_BACKHAUL_TYPE,
            Self::WiFiBackhaulStats => uuids::WIFI_BACKHAUL_STATS,
        }
    }

    pub fn service(self) -> ServiceKind {
        match self {
            Self::SystemId
            | Self::ModelNumber
            | Self::SerialNumber
            | Self::FirmwareRevision
            | Self::HardwareRevision
            | Self::SoftwareRevision
            | Self::ManufacturerName => ServiceKind::DeviceInformation,
            _ => ServiceKind::XleSetup,
        }
    }

    /// Value used when the operator has not entered anything yet
    pub fn default_value(self) -> &'static str {
        match self {
            Self::SystemId => "deadbeef",
            Self::ModelNumber => "1",
            Self::SerialNumber => "888888888888",
            Self::FirmwareRevision | Self::HardwareRevision | Self::SoftwareRevision => "1",
            Self::ManufacturerName => "Anil Katragadda",
            Self::QrCode => "xfinity.this.that",
            Self::ProvisionStatus
            | Self::SimIccid
            | Self::ModemImei
            | Self::CellularSignalStrength
            | Self::MeshBackhaulType
            | Self::WiFiBackhaulStats => "0",
        }
    }

    pub fn properties(self) -> CharacteristicProperties {
        CharacteristicProperties::default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SystemId => "SystemId",
            Self::ModelNumber => "ModelNumber",
            Self::SerialNumber => "SerialNumber",
            Self::FirmwareRevision => "FirmwareRevision",
            Self::HardwareRevision => "HardwareRevision",
            Self::SoftwareRevision => "SoftwareRevision",
            Self::ManufacturerName => "ManufacturerName",
            Self::QrCode => "QR Code",
            Self::ProvisionStatus => "Provision Status",
            Self::SimIccid => "SIM ICCID",
            Self::ModemImei => "Modem IMEI",
            Self::CellularSignalStrength => "Cellular Signal Strength",
            Self::MeshBackhaulType => "Mesh Backhaul Type",
            Self::WiFiBackhaulStats => "Wi-Fi Backhaul Stats",
        }
    }

    /// Reverse lookup by attribute identity within one service
    pub fn find(service: ServiceKind, identity: BleUuid) -> Option<CharacteristicId> {
        service
            .characteristics()
            .iter()
            .copied()
            .find(|id| id.identity() == identity)
    }
}

/// A characteristic as it is handed to the radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicSpec {
    pub id: CharacteristicId,
    pub identity: BleUuid,
    pub properties: CharacteristicProperties,
    /// Value seeded at build time
    pub value: Vec<u8>,
}

/// A primary GATT service ready to be added to a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub identity: BleUuid,
    pub characteristics: Vec<CharacteristicSpec>,
}

/// Build the descriptor for `kind`, seeding every characteristic with its
/// current value from `store`.
pub fn build_service(kind: ServiceKind, store: &ValueStore) -> ServiceDescriptor {
    let characteristics = kind
        .characteristics()
        .iter()
        .map(|&id| CharacteristicSpec {
            id,
            identity: id.identity(),
            properties: id.properties(),
            value: store.encoded(id),
        })
        .collect();

    ServiceDescriptor {
        kind,
        identity: kind.identity(),
        characteristics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sig_uuid_expansion() {
        assert_eq!(
            uuids::SYSTEM_ID.to_uuid().to_string(),
            "00002a23-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            uuids::DEVICE_INFORMATION_SERVICE.to_uuid().to_string(),
            "0000180a-0000-1000-8000-00805f9b34fb"
        );
        let long_form = BleUuid::Vendor128(uuids::MANUFACTURER_NAME.to_uuid());
        assert_eq!(long_form, uuids::MANUFACTURER_NAME);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(uuids::SERIAL_NUMBER.to_string(), "0x2A25");
        assert_eq!(
            uuids::XLE_SETUP_SERVICE.to_string(),
            "01b073ea-24d3-4544-b88b-9525eaa29080"
        );
        assert_eq!(
            uuids::WIFI_BACKHAUL_STATS.to_string(),
            "4c3629ef-2865-40be-8ef0-48d6f6cf1915"
        );
    }

    #[test]
    fn test_identities_unique_within_service() {
        for kind in ServiceKind::ALL {
            let ids: HashSet<BleUuid> = kind.characteristics().iter().map(|c| c.identity()).collect();
            assert_eq!(ids.len(), 7, "{kind} has duplicate identities");
        }
    }

    #[test]
    fn test_characteristics_belong_to_their_service() {
        for kind in ServiceKind::ALL {
            for id in kind.characteristics() {
                assert_eq!(id.service(), kind);
                assert_eq!(CharacteristicId::find(kind, id.identity()), Some(*id));
            }
        }
        assert_eq!(
            CharacteristicId::find(ServiceKind::XleSetup, uuids::SYSTEM_ID),
            None
        );
    }

    #[test]
    fn test_build_service_seeds_current_values() {
        let mut store = ValueStore::default();
        store.set(CharacteristicId::ModelNumber, "XLE-2");

        let service = build_service(ServiceKind::DeviceInformation, &store);
        assert_eq!(service.identity, uuids::DEVICE_INFORMATION_SERVICE);
        assert_eq!(service.characteristics.len(), 7);
        assert_eq!(service.characteristics[0].value, b"deadbeef".to_vec());
        assert_eq!(service.characteristics[1].value, b"XLE-2".to_vec());
        assert!(service
            .characteristics
            .iter()
            .all(|c| c.properties == CharacteristicProperties::READ));

        let setup = build_service(ServiceKind::XleSetup, &store);
        assert_eq!(setup.characteristics[0].identity, uuids::QR_CODE);
        assert_eq!(setup.characteristics[0].value, b"xfinity.this.that".to_vec());
    }

    #[test]
    fn test_characteristics_are_read_only() {
        assert_eq!(CharacteristicProperties::default().bits(), 0x02);
        for id in CharacteristicId::ALL {
            assert_eq!(id.properties(), CharacteristicProperties::READ);
        }
    }
}
