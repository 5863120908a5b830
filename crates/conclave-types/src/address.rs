use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// 32-byte participant identity: a multisig wallet, a voter, an electorate
/// or a token mint. Display format: Bech32m with "conc" human-readable
/// prefix.
///
/// Identities are opaque to the engine. They are compared for equality in
/// authorization checks and fed as seeds into record-key derivation; the
/// engine never inspects their contents.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);
    pub const LEN: usize = 32;

    /// Bech32m human-readable prefix
    pub const BECH32_HRP: &'static str = "conc";

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a byte slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        if slice.len() != Self::LEN {
            return Err(TypesError::InvalidAddressLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Check if this is the zero identity
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Convert to hex string without 0x prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = bech32::Hrp::parse_unchecked(Self::BECH32_HRP);
        match bech32::encode::<bech32::Bech32m>(hrp, &self.0) {
            Ok(encoded) => write!(f, "{}", encoded),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Support both Bech32m ("conc1...") and hex ("0x...")
        if s.starts_with("conc1") {
            let (hrp, data) = bech32::decode(s)
                .map_err(|e| TypesError::Bech32Error(e.to_string()))?;

            let expected_hrp = bech32::Hrp::parse_unchecked(Self::BECH32_HRP);
            if hrp != expected_hrp {
                return Err(TypesError::InvalidAddressFormat(format!(
                    "Invalid HRP: expected '{}', got '{}'",
                    Self::BECH32_HRP,
                    hrp
                )));
            }

            let data_len = data.len();
            let bytes: [u8; 32] = data
                .try_into()
                .map_err(|_| TypesError::InvalidAddressLength(data_len))?;

            Ok(Self::from_bytes(bytes))
        } else if s.starts_with("0x") || s.starts_with("0X") {
            let bytes = hex::decode(&s[2..])?;
            Self::from_slice(&bytes)
        } else {
            Err(TypesError::InvalidAddressFormat(s.to_string()))
        }
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_zero() {
        assert_eq!(Address::ZERO.as_bytes(), &[0u8; 32]);
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_from_bytes() {
        let bytes = [1u8; 32];
        let addr = Address::from_bytes(bytes);
        assert_eq!(addr.as_bytes(), &bytes);
        assert!(!addr.is_zero());
    }

    #[test]
    fn test_address_from_slice_wrong_length() {
        assert!(Address::from_slice(&[0u8; 20]).is_err());
        assert!(Address::from_slice(&[0u8; 33]).is_err());
        assert!(Address::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_address_bech32m_roundtrip() {
        let bytes: [u8; 32] = (0..32)
            .map(|i| i as u8)
            .collect::<Vec<_>>()
            .try_into()
            .unwrap();
        let addr = Address::from_bytes(bytes);

        let encoded = addr.to_string();
        assert!(encoded.starts_with("conc1"));

        let decoded: Address = encoded.parse().unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let bytes = [0xabu8; 32];
        let addr = Address::from_bytes(bytes);

        let hex = format!("{:x}", addr);
        let parsed: Address = hex.parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_address_from_str_invalid() {
        assert!(Address::from_str("invalid").is_err());
        assert!(Address::from_str("xyz1...").is_err());
        assert!(Address::from_str("0x1234").is_err());
    }

    #[test]
    fn test_address_ordering() {
        let addr1 = Address::from_bytes([0u8; 32]);
        let addr2 = Address::from_bytes([1u8; 32]);
        assert!(addr1 < addr2);
    }
}
