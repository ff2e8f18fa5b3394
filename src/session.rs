use crate::address::{message_address, thread_address};
use crate::crypto::{self, SharedKey};
use crate::{Error, Keypair, Pubkey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An encrypted direct conversation seen from one participant.
///
/// Holds the pair's shared key together with everything needed to derive
/// message addresses, so ciphertexts are always sealed under the nonce of the
/// address they will be stored at.
pub struct DirectSession {
    program_id: Pubkey,
    me: Pubkey,
    peer: Pubkey,
    thread: Pubkey,
    shared_key: SharedKey,
}

impl DirectSession {
    /// Opens a session between `me` and `peer`.
    pub fn new(program_id: &Pubkey, me: &Keypair, peer: &Pubkey) -> Result<Self, Error> {
        let my_key = me.pubkey();
        if my_key == *peer {
            return Err(Error::invalid("Cannot open a direct thread with yourself"));
        }

        let (thread, _) = thread_address(program_id, &my_key, peer)?;
        let shared_key = SharedKey::between(me, peer)?;

        Ok(Self {
            program_id: *program_id,
            me: my_key,
            peer: *peer,
            thread,
            shared_key,
        })
    }

    pub fn me(&self) -> &Pubkey {
        &self.me
    }

    pub fn peer(&self) -> &Pubkey {
        &self.peer
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Address of the thread account, identical for both participants.
    pub fn thread_address(&self) -> &Pubkey {
        &self.thread
    }

    /// Address of message `index` in this thread.
    pub fn message_address(&self, index: u32) -> Result<Pubkey, Error> {
        message_address(&self.program_id, index, &self.me, &self.peer).map(|(address, _)| address)
    }

    /// Encrypts the body of message `index`, returning its address and ciphertext.
    pub fn encrypt(&self, index: u32, plaintext: &[u8]) -> Result<(Pubkey, Vec<u8>), Error> {
        let address = self.message_address(index)?;
        let ciphertext = crypto::encrypt(&self.shared_key, &address, plaintext)?;
        Ok((address, ciphertext))
    }

    /// Decrypts the body of message `index`.
    pub fn decrypt(&self, index: u32, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let address = self.message_address(index)?;
        self.decrypt_at(&address, ciphertext)
    }

    /// Decrypts a body whose message address is already known.
    pub fn decrypt_at(&self, message_address: &Pubkey, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        crypto::decrypt(&self.shared_key, message_address, ciphertext)
    }
}

impl Zeroize for DirectSession {
    fn zeroize(&mut self) {
        self.shared_key.zeroize();
    }
}

impl ZeroizeOnDrop for DirectSession {}
