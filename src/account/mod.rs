//! Binary layouts of the accounts owned by the messaging program.
//!
//! Every account starts with a one-byte [`Tag`]; the rest is a Borsh-style
//! layout (little-endian integers, `u32` length prefixes, one-byte option and
//! bool flags). Decoding tolerates trailing bytes so older clients keep
//! reading accounts that grew new fields. Encoding is exact.

mod group;
pub use group::*;
mod message;
pub use message::*;
mod profile;
pub use profile::*;
mod subscription;
pub use subscription::*;
mod thread;
pub use thread::*;

use crate::Error;
use borsh::{BorshDeserialize, BorshSerialize};

/// Discriminant stored in the first byte of every account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Uninitialized = 0,
    Profile = 1,
    Thread = 2,
    Message = 3,
    GroupThread = 4,
    GroupThreadIndex = 5,
    Subscription = 6,
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Profile),
            2 => Ok(Self::Thread),
            3 => Ok(Self::Message),
            4 => Ok(Self::GroupThread),
            5 => Ok(Self::GroupThreadIndex),
            6 => Ok(Self::Subscription),
            other => Err(Error::Decode(format!("Unknown account tag {other}"))),
        }
    }
}

/// An account body with a fixed tag.
pub trait AccountState: BorshSerialize + BorshDeserialize {
    /// Tag every encoding of this account starts with.
    const TAG: Tag;

    /// Decodes an account of this kind, rejecting any other tag.
    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (tag, mut body) = bytes
            .split_first()
            .ok_or_else(|| Error::Decode("Empty account data".to_string()))?;

        if *tag != Self::TAG as u8 {
            return Err(Error::Decode(format!(
                "Expected {:?} tag ({}), found {tag}",
                Self::TAG,
                Self::TAG as u8
            )));
        }

        Ok(Self::deserialize(&mut body)?)
    }

    /// Encodes the tag followed by the body, with no trailing bytes.
    fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![Self::TAG as u8];
        self.serialize(&mut bytes)
            .map_err(|err| Error::Serde(format!("Failed to encode {:?}: {err}", Self::TAG)))?;
        Ok(bytes)
    }
}

/// Any account owned by the messaging program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Account {
    Profile(Profile),
    Thread(Thread),
    Message(Message),
    GroupThread(GroupThread),
    GroupThreadIndex(GroupThreadIndex),
    Subscription(Subscription),
}

impl Account {
    /// Returns the tag this account encodes with.
    pub fn tag(&self) -> Tag {
        match self {
            Self::Profile(_) => Tag::Profile,
            Self::Thread(_) => Tag::Thread,
            Self::Message(_) => Tag::Message,
            Self::GroupThread(_) => Tag::GroupThread,
            Self::GroupThreadIndex(_) => Tag::GroupThreadIndex,
            Self::Subscription(_) => Tag::Subscription,
        }
    }
}

/// Decodes an account of unknown kind by dispatching on its tag.
pub fn decode(bytes: &[u8]) -> Result<Account, Error> {
    let tag = bytes
        .first()
        .ok_or_else(|| Error::Decode("Empty account data".to_string()))?;

    match Tag::try_from(*tag)? {
        Tag::Uninitialized => Err(Error::Decode("Account is not initialized".to_string())),
        Tag::Profile => Profile::decode(bytes).map(Account::Profile),
        Tag::Thread => Thread::decode(bytes).map(Account::Thread),
        Tag::Message => Message::decode(bytes).map(Account::Message),
        Tag::GroupThread => GroupThread::decode(bytes).map(Account::GroupThread),
        Tag::GroupThreadIndex => GroupThreadIndex::decode(bytes).map(Account::GroupThreadIndex),
        Tag::Subscription => Subscription::decode(bytes).map(Account::Subscription),
    }
}

/// Encodes any account, tag first.
pub fn encode(account: &Account) -> Result<Vec<u8>, Error> {
    match account {
        Account::Profile(inner) => inner.encode(),
        Account::Thread(inner) => inner.encode(),
        Account::Message(inner) => inner.encode(),
        Account::GroupThread(inner) => inner.encode(),
        Account::GroupThreadIndex(inner) => inner.encode(),
        Account::Subscription(inner) => inner.encode(),
    }
}
