//! Value Store
//!
//! Operator entered text for every characteristic. This is the single source
//! of truth; the GATT session is only a projection of it onto the air.

use crate::domain::catalog::CharacteristicId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStore {
    values: BTreeMap<CharacteristicId, String>,
}

impl ValueStore {
    /// Store seeded with the catalog defaults
    pub fn with_defaults() -> Self {
        let values = CharacteristicId::ALL
            .iter()
            .map(|&id| (id, id.default_value().to_string()))
            .collect();
        Self { values }
    }

    /// Defaults overlaid with previously remembered values
    pub fn with_overrides(overrides: &BTreeMap<CharacteristicId, String>) -> Self {
        let mut store = Self::with_defaults();
        for (&id, text) in overrides {
            store.set(id, text.clone());
        }
        store
    }

    pub fn get(&self, id: CharacteristicId) -> &str {
        self.values
            .get(&id)
            .map(String::as_str)
            .unwrap_or_else(|| id.default_value())
    }

    pub fn set(&mut self, id: CharacteristicId, text: impl Into<String>) {
        self.values.insert(id, text.into());
    }

    /// Wire form of the current value
    pub fn encoded(&self, id: CharacteristicId) -> Vec<u8> {
        to_latin1(self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CharacteristicId, &str)> {
        self.values.iter().map(|(&id, text)| (id, text.as_str()))
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Encode text as raw Latin-1 bytes.
///
/// Characters outside Latin-1 become `?`. No terminator, no length prefix.
pub fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_characteristic() {
        let store = ValueStore::default();
        assert_eq!(store.iter().count(), CharacteristicId::ALL.len());
        assert_eq!(store.get(CharacteristicId::SystemId), "deadbeef");
        assert_eq!(store.get(CharacteristicId::SerialNumber), "888888888888");
        assert_eq!(store.get(CharacteristicId::ManufacturerName), "Anil Katragadda");
        assert_eq!(store.get(CharacteristicId::QrCode), "xfinity.this.that");
        assert_eq!(store.get(CharacteristicId::WiFiBackhaulStats), "0");
    }

    #[test]
    fn test_set_replaces_value() {
        let mut store = ValueStore::default();
        store.set(CharacteristicId::SimIccid, "8901260");
        assert_eq!(store.get(CharacteristicId::SimIccid), "8901260");
        store.set(CharacteristicId::SimIccid, "");
        assert_eq!(store.get(CharacteristicId::SimIccid), "");
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let mut remembered = BTreeMap::new();
        remembered.insert(CharacteristicId::ModemImei, "356938035643809".to_string());

        let store = ValueStore::with_overrides(&remembered);
        assert_eq!(store.get(CharacteristicId::ModemImei), "356938035643809");
        assert_eq!(store.get(CharacteristicId::ModelNumber), "1");
    }

    #[test]
    fn test_latin1_encoding() {
        assert_eq!(to_latin1("abc"), b"abc".to_vec());
        assert_eq!(to_latin1("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(to_latin1("a€b"), b"a?b".to_vec());
        assert!(to_latin1("").is_empty());
    }
}
