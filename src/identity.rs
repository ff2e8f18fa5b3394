use crate::{Error, Pubkey, X25519Secret};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

/// Generates a cryptographically secure random 32-byte seed.
pub(crate) fn generate_random_seed() -> Result<Box<[u8; 32]>, Error> {
    let mut seed = Box::new([0u8; 32]);
    OsRng
        .try_fill_bytes(seed.as_mut_slice())
        .map_err(|_| Error::Random)?;
    Ok(seed)
}

/// An identity's Ed25519 signing keypair.
///
/// The same key signs ledger transactions and, after conversion to X25519,
/// agrees on the per-pair secret used to encrypt direct messages.
pub struct Keypair {
    signing_key: Box<SigningKey>,
}

impl Keypair {
    /// Creates a new keypair from OS randomness.
    pub fn new() -> Result<Self, Error> {
        let mut seed = generate_random_seed()?;
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        Ok(keypair)
    }

    /// Recreates a keypair from its 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: Box::new(SigningKey::from_bytes(seed)),
        }
    }

    /// The public key, which is also the identity's ledger address.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::from(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs a message with the Ed25519 key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Verifies a signature made by `signer` over `message`.
    pub fn verify(signer: &Pubkey, message: &[u8], signature: &Signature) -> Result<(), Error> {
        let verifying_key = VerifyingKey::from_bytes(signer.as_bytes())
            .map_err(|err| Error::Crypto(format!("Invalid signer key: {err}")))?;
        verifying_key
            .verify(message, signature)
            .map_err(|err| Error::Crypto(format!("Signature verification failed: {err}")))
    }

    /// Converts the signing secret into the matching X25519 secret.
    ///
    /// Takes the low half of SHA-512 of the seed, the same scalar Ed25519 signs
    /// with. X25519 clamps it on use.
    pub fn exchange_secret(&self) -> X25519Secret {
        let mut digest = Sha512::digest(self.signing_key.as_bytes());
        let mut scalar = Box::new([0u8; 32]);
        scalar.copy_from_slice(&digest[..32]);
        digest.as_mut_slice().zeroize();

        X25519Secret::from(scalar)
    }

    /// Serializes as `seed ‖ public key`, the usual 64-byte wallet format.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }
}

impl TryFrom<&[u8; 64]> for Keypair {
    type Error = Error;

    /// Deserializes a `seed ‖ public key` pair, checking that the halves agree.
    fn try_from(bytes: &[u8; 64]) -> Result<Self, Self::Error> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| Error::invalid("Keypair bytes do not match their public key"))?;

        Ok(Self {
            signing_key: Box::new(signing_key),
        })
    }
}
