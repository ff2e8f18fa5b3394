use super::{AccountState, Tag};
use crate::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

/// A one-way "follows" edge from `subscriber` to `subscribed_to`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber: Pubkey,
    pub subscribed_to: Pubkey,
    pub bump: u8,
}

impl Subscription {
    /// Byte offset of `subscriber` in the encoded account.
    pub const SUBSCRIBER_OFFSET: usize = 1;
}

impl AccountState for Subscription {
    const TAG: Tag = Tag::Subscription;
}
