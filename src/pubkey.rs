use crate::Error;
use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of every key and address on the ledger.
pub const PUBKEY_LEN: usize = 32;

/// A 32-byte ledger key: either an Ed25519 public key or a program-owned address.
///
/// Ordering is byte-lexicographic, which is the canonical order used when a
/// pair of identities seeds an address.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct Pubkey([u8; PUBKEY_LEN]);

impl Pubkey {
    /// Wraps raw key bytes.
    pub const fn new_from_array(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }

    /// Returns a copy of the raw key bytes.
    pub fn to_bytes(&self) -> [u8; PUBKEY_LEN] {
        self.0
    }
}

impl From<[u8; PUBKEY_LEN]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PUBKEY_LEN] = bytes.try_into().map_err(|_| {
            Error::invalid(format!(
                "Key must be {PUBKEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|err| Error::invalid(format!("Invalid base58 key {s:?}: {err}")))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58_round_trip() {
        let key = Pubkey::new_from_array([7u8; 32]);
        let text = key.to_string();

        assert_eq!(text.parse::<Pubkey>().unwrap(), key);
    }

    #[test]
    fn test_system_program_text_form() {
        // All-zero key is the well-known system program id.
        assert_eq!(
            Pubkey::default().to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            "abc".parse::<Pubkey>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(Pubkey::try_from(&[1u8; 31][..]).is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut low = [0u8; 32];
        let mut high = [0u8; 32];
        low[0] = 1;
        high[0] = 2;
        low[31] = 255;

        assert!(Pubkey::from(low) < Pubkey::from(high));
    }
}
