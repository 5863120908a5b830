//! Serialization implementations for conclave-types
//!
//! Identities serialize as their Bech32m string form, record keys as 0x hex.

use crate::*;

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    impl Serialize for Address {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            self.to_string().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Address {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            Address::from_str(&s).map_err(serde::de::Error::custom)
        }
    }

    impl Serialize for RecordKey {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            self.to_string().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for RecordKey {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            RecordKey::from_str(&s).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_address_json_roundtrip() {
        let addr = Address::from_bytes([5u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.contains("conc1"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_record_key_json_roundtrip() {
        let key = RecordKey::derive(&[b"governor", &[5u8; 32]]);
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.contains("0x"));
        let back: RecordKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
