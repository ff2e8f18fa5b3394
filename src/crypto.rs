//! Direct-message encryption.
//!
//! Both participants convert their Ed25519 identities to X25519, agree on a
//! shared secret, and seal message bodies with XSalsa20-Poly1305 (the NaCl
//! `box` construction). The nonce is never transmitted: it is the first 24
//! bytes of the message's own program-owned address.
//!
//! Message addresses are unique per (index, canonical participant pair), so a
//! nonce is never reused under the same key. Anything that lets two messages
//! share an address breaks this.

use crate::{Error, Keypair, Pubkey, X25519PublicKey, X25519Secret};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use salsa20::cipher::consts::U10;
use salsa20::cipher::generic_array::GenericArray;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the XSalsa20 nonce taken from a message address.
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 tag prepended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Symmetric key shared by the two participants of a direct thread.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey(Box<[u8; 32]>);

impl SharedKey {
    /// Derives the key from our X25519 secret and the peer's X25519 public key.
    ///
    /// Equivalent to NaCl `box.before`: HSalsa20 over the raw X25519 output.
    pub fn derive(own: &X25519Secret, peer: &X25519PublicKey) -> Self {
        let shared_secret = own.dh(peer);
        let mut subkey = salsa20::hsalsa::<U10>(
            GenericArray::from_slice(shared_secret.as_bytes()),
            &GenericArray::default(),
        );

        let mut key = Box::new([0u8; 32]);
        key.copy_from_slice(subkey.as_slice());
        subkey.as_mut_slice().zeroize();

        Self(key)
    }

    /// Derives the key between our signing identity and a peer's public key.
    pub fn between(me: &Keypair, peer: &Pubkey) -> Result<Self, Error> {
        let peer = X25519PublicKey::from_ed25519(peer)?;
        Ok(Self::derive(&me.exchange_secret(), &peer))
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(Key::from_slice(self.0.as_slice()))
    }
}

/// Returns the nonce bound to a message address.
pub fn nonce_from_address(message_address: &Pubkey) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&message_address.as_bytes()[..NONCE_LEN]);
    nonce
}

/// Seals `plaintext` for the message stored at `message_address`.
///
/// Output is the 16-byte tag followed by the ciphertext.
pub fn encrypt(key: &SharedKey, message_address: &Pubkey, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let nonce = nonce_from_address(message_address);
    key.cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| Error::Crypto("Message encryption failed".to_string()))
}

/// Opens a body sealed by [`encrypt`].
///
/// Fails with [`Error::Crypto`] on a wrong key, wrong address or any tampering;
/// no partial plaintext is ever returned.
pub fn decrypt(key: &SharedKey, message_address: &Pubkey, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    if ciphertext.len() < TAG_LEN {
        return Err(Error::Crypto(format!(
            "Ciphertext of {} bytes is shorter than the authentication tag",
            ciphertext.len()
        )));
    }

    let nonce = nonce_from_address(message_address);
    Ok(key.cipher().decrypt(Nonce::from_slice(&nonce), ciphertext)?)
}
