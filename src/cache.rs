//! Session-scoped caches over a durable string key/value store.
//!
//! Keys are namespaced by category so unrelated values never collide:
//! `last-count:<address>`, `decrypted:<address>`, `resolved-name:<address>`
//! and `archived-set`. Structured values are Protocol Buffers records wrapped
//! in base64 for text-only stores.

use crate::{Error, Pubkey};
use base64::Engine;
use prost::Message;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A durable string key/value store, e.g. the platform's local storage.
pub trait LocalCache {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&mut self, key: &str, value: String) -> Result<(), Error>;

    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// Non-durable [`LocalCache`] for tests and short-lived sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

impl MemoryCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Namespaced cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKey<'a> {
    /// Highest message count synchronized for a thread or group.
    LastCount(&'a Pubkey),
    /// Plaintext of a decrypted message.
    Decrypted(&'a Pubkey),
    /// Display name resolved for a wallet.
    ResolvedName(&'a Pubkey),
    /// Threads the user archived.
    ArchivedSet,
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastCount(address) => write!(f, "last-count:{address}"),
            Self::Decrypted(address) => write!(f, "decrypted:{address}"),
            Self::ResolvedName(address) => write!(f, "resolved-name:{address}"),
            Self::ArchivedSet => f.write_str("archived-set"),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct DecryptedRecord {
    #[prost(bytes = "vec", tag = "1")]
    pub plaintext: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ArchivedSetRecord {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub threads: Vec<Vec<u8>>,
}

fn encode_record<M: Message>(record: &M) -> Result<String, Error> {
    let mut buf = Vec::with_capacity(record.encoded_len());
    record
        .encode(&mut buf)
        .map_err(|err| Error::Serde(format!("Failed to encode cache record: {err:?}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(buf))
}

fn decode_record<M: Message + Default>(value: &str) -> Result<M, Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|err| Error::Serde(format!("Cache record is not base64: {err}")))?;

    M::decode(bytes.as_slice())
        .map_err(|err| Error::Serde(format!("Failed to decode cache record: {err:?}")))
}

/// Everything the client remembers between synchronization passes.
///
/// Created when a user session starts and dropped (or [`into_inner`]ed) when
/// it ends; never shared globally.
///
/// [`into_inner`]: SessionCache::into_inner
pub struct SessionCache<C: LocalCache> {
    store: C,
}

impl<C: LocalCache> SessionCache<C> {
    pub fn new(store: C) -> Self {
        Self { store }
    }

    /// Ends the session, handing back the underlying store.
    pub fn into_inner(self) -> C {
        self.store
    }

    /// Last synchronized message count of the thread or group at `address`.
    pub fn last_count(&self, address: &Pubkey) -> Result<Option<u32>, Error> {
        let Some(value) = self.store.get(&CacheKey::LastCount(address).to_string())? else {
            return Ok(None);
        };

        value
            .parse()
            .map(Some)
            .map_err(|err| Error::Serde(format!("Corrupt last-count for {address}: {err}")))
    }

    /// Raises the stored count to `count`. Never lowers it.
    ///
    /// Returns the count now stored.
    pub fn advance_last_count(&mut self, address: &Pubkey, count: u32) -> Result<u32, Error> {
        match self.last_count(address)? {
            Some(current) if current >= count => Ok(current),
            _ => {
                self.store
                    .set(&CacheKey::LastCount(address).to_string(), count.to_string())?;
                Ok(count)
            }
        }
    }

    /// Cached plaintext of the message at `message_address`.
    pub fn decrypted(&self, message_address: &Pubkey) -> Result<Option<Vec<u8>>, Error> {
        self.store
            .get(&CacheKey::Decrypted(message_address).to_string())?
            .map(|value| decode_record::<DecryptedRecord>(&value).map(|record| record.plaintext))
            .transpose()
    }

    pub fn store_decrypted(&mut self, message_address: &Pubkey, plaintext: &[u8]) -> Result<(), Error> {
        let record = DecryptedRecord {
            plaintext: plaintext.to_vec(),
        };
        self.store.set(
            &CacheKey::Decrypted(message_address).to_string(),
            encode_record(&record)?,
        )
    }

    /// Forgets a cached plaintext, e.g. after the message was deleted.
    pub fn forget_decrypted(&mut self, message_address: &Pubkey) -> Result<(), Error> {
        self.store
            .remove(&CacheKey::Decrypted(message_address).to_string())
    }

    pub fn resolved_name(&self, wallet: &Pubkey) -> Result<Option<String>, Error> {
        self.store.get(&CacheKey::ResolvedName(wallet).to_string())
    }

    pub fn store_resolved_name(&mut self, wallet: &Pubkey, name: &str) -> Result<(), Error> {
        self.store
            .set(&CacheKey::ResolvedName(wallet).to_string(), name.to_string())
    }

    /// Threads the user archived.
    pub fn archived(&self) -> Result<BTreeSet<Pubkey>, Error> {
        let Some(value) = self.store.get(&CacheKey::ArchivedSet.to_string())? else {
            return Ok(BTreeSet::new());
        };

        decode_record::<ArchivedSetRecord>(&value)?
            .threads
            .iter()
            .map(|bytes| Pubkey::try_from(bytes.as_slice()))
            .collect()
    }

    pub fn is_archived(&self, thread: &Pubkey) -> Result<bool, Error> {
        Ok(self.archived()?.contains(thread))
    }

    /// Adds `thread` to, or removes it from, the archived set.
    pub fn set_archived(&mut self, thread: &Pubkey, archived: bool) -> Result<(), Error> {
        let mut threads = self.archived()?;
        let changed = if archived {
            threads.insert(*thread)
        } else {
            threads.remove(thread)
        };
        if !changed {
            return Ok(());
        }

        let record = ArchivedSetRecord {
            threads: threads.iter().map(|key| key.to_bytes().to_vec()).collect(),
        };
        self.store
            .set(&CacheKey::ArchivedSet.to_string(), encode_record(&record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    #[test]
    fn test_keys_are_namespaced() {
        let key = address(1);

        assert_eq!(
            CacheKey::LastCount(&key).to_string(),
            format!("last-count:{key}")
        );
        assert_eq!(
            CacheKey::Decrypted(&key).to_string(),
            format!("decrypted:{key}")
        );
        assert_eq!(
            CacheKey::ResolvedName(&key).to_string(),
            format!("resolved-name:{key}")
        );
        assert_eq!(CacheKey::ArchivedSet.to_string(), "archived-set");
    }

    #[test]
    fn test_last_count_is_monotonic() {
        let mut cache = SessionCache::new(MemoryCache::default());
        let thread = address(1);

        assert_eq!(cache.last_count(&thread).unwrap(), None);
        assert_eq!(cache.advance_last_count(&thread, 10).unwrap(), 10);
        assert_eq!(cache.advance_last_count(&thread, 4).unwrap(), 10);
        assert_eq!(cache.advance_last_count(&thread, 12).unwrap(), 12);
        assert_eq!(cache.last_count(&thread).unwrap(), Some(12));

        // Other threads are independent.
        assert_eq!(cache.last_count(&address(2)).unwrap(), None);
    }

    #[test]
    fn test_decrypted_round_trip() {
        let mut cache = SessionCache::new(MemoryCache::default());
        let message = address(3);

        cache.store_decrypted(&message, b"hello").unwrap();
        assert_eq!(cache.decrypted(&message).unwrap(), Some(b"hello".to_vec()));

        cache.forget_decrypted(&message).unwrap();
        assert_eq!(cache.decrypted(&message).unwrap(), None);
    }

    #[test]
    fn test_archived_set() {
        let mut cache = SessionCache::new(MemoryCache::default());

        cache.set_archived(&address(1), true).unwrap();
        cache.set_archived(&address(2), true).unwrap();
        cache.set_archived(&address(1), false).unwrap();

        assert!(!cache.is_archived(&address(1)).unwrap());
        assert!(cache.is_archived(&address(2)).unwrap());
        assert_eq!(cache.into_inner().len(), 1);
    }

    #[test]
    fn test_corrupt_values_are_errors() {
        let mut store = MemoryCache::default();
        let thread = address(1);
        store
            .set(&CacheKey::LastCount(&thread).to_string(), "ten".to_string())
            .unwrap();
        store
            .set(&CacheKey::Decrypted(&thread).to_string(), "%%%".to_string())
            .unwrap();
        let cache = SessionCache::new(store);

        assert!(matches!(cache.last_count(&thread), Err(Error::Serde(_))));
        assert!(matches!(cache.decrypted(&thread), Err(Error::Serde(_))));
    }
}
