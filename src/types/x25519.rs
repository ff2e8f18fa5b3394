use crate::{Error, Pubkey};
use curve25519_dalek::edwards::CompressedEdwardsY;
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public half of an identity's key-exchange keypair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    /// Maps an Ed25519 public key onto the Montgomery curve.
    ///
    /// Fails for bytes that are not a valid Edwards point, such as program-owned
    /// addresses.
    pub fn from_ed25519(key: &Pubkey) -> Result<Self, Error> {
        let point = CompressedEdwardsY(key.to_bytes())
            .decompress()
            .ok_or_else(|| Error::invalid(format!("{key} is not an Ed25519 public key")))?;

        Ok(Self(PublicKey::from(point.to_montgomery().to_bytes())))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl AsRef<PublicKey> for X25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

/// Secret half of an identity's key-exchange keypair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct X25519Secret(Box<StaticSecret>);

impl X25519Secret {
    pub(crate) fn dh(&self, public_key: &X25519PublicKey) -> SharedSecret {
        self.0.diffie_hellman(public_key.as_ref())
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(self.0.as_ref()))
    }
}

impl From<Box<[u8; 32]>> for X25519Secret {
    fn from(mut bytes: Box<[u8; 32]>) -> Self {
        let secret = StaticSecret::from(*bytes);
        bytes.zeroize();
        Self(Box::new(secret))
    }
}
