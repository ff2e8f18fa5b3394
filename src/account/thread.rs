use super::{AccountState, Tag};
use crate::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

/// A direct conversation between exactly two identities.
///
/// `user_1` and `user_2` are stored in canonical order.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Thread {
    /// Number of messages ever sent; also the index of the next message.
    pub msg_count: u32,
    pub user_1: Pubkey,
    pub user_2: Pubkey,
    pub last_message_time: i64,
    pub bump: u8,
}

impl Thread {
    /// Byte offset of `user_1` in the encoded account.
    pub const USER_1_OFFSET: usize = 1 + 4;
    /// Byte offset of `user_2` in the encoded account.
    pub const USER_2_OFFSET: usize = Self::USER_1_OFFSET + 32;

    /// Returns true if `key` is one of the two participants.
    pub fn is_participant(&self, key: &Pubkey) -> bool {
        self.user_1 == *key || self.user_2 == *key
    }

    /// Returns the participant that is not `me`.
    pub fn peer_of(&self, me: &Pubkey) -> Option<Pubkey> {
        if self.user_1 == *me {
            Some(self.user_2)
        } else if self.user_2 == *me {
            Some(self.user_1)
        } else {
            None
        }
    }
}

impl AccountState for Thread {
    const TAG: Tag = Tag::Thread;
}
