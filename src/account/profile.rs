use super::{AccountState, Tag};
use borsh::{BorshDeserialize, BorshSerialize};

/// Longest bio the program accepts.
pub const MAX_BIO_LEN: usize = 280;

/// Longest content hash accepted for a picture reference.
pub const MAX_PICTURE_HASH_LEN: usize = 64;

/// Public identity metadata of a user. One per owner key, created on first edit.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub bump: u8,
    /// Fee charged to senders of direct messages, in the ledger's smallest unit.
    pub lamports_per_message: u64,
    /// Whether strangers may open a direct thread.
    pub allow_dm: bool,
    pub tips_sent: u64,
    pub tips_received: u64,
    /// Blob store hash of the profile picture, empty when unset.
    pub picture_hash: String,
    /// Preferred display name reference, empty when unset.
    pub display_domain_name: String,
    pub bio: String,
}

impl AccountState for Profile {
    const TAG: Tag = Tag::Profile;
}
