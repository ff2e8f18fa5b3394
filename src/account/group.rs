use super::{AccountState, Tag};
use crate::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

/// Longest group name; the name is an address seed.
pub const MAX_GROUP_NAME_LEN: usize = crate::address::MAX_SEED_LEN;

/// A multi-party conversation, addressed by (name, owner).
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupThread {
    pub owner: Pubkey,
    /// Wallet collecting the per-message fee.
    pub destination_wallet: Pubkey,
    pub msg_count: u32,
    pub lamports_per_message: u64,
    pub last_message_time: i64,
    pub bump: u8,
    pub visible: bool,
    pub media_enabled: bool,
    /// Only admins may post.
    pub admin_only: bool,
    pub group_name: String,
    pub group_pic_hash: String,
    /// Admin keys. Removal is by position, so order matters.
    pub admins: Vec<Pubkey>,
}

impl GroupThread {
    /// Byte offset of `owner` in the encoded account.
    pub const OWNER_OFFSET: usize = 1;

    /// Position of `key` in the admin vector.
    pub fn admin_index(&self, key: &Pubkey) -> Option<usize> {
        self.admins.iter().position(|admin| admin == key)
    }

    pub fn is_admin(&self, key: &Pubkey) -> bool {
        self.admin_index(key).is_some()
    }
}

impl AccountState for GroupThread {
    const TAG: Tag = Tag::GroupThread;
}

/// Marker proving `owner` is a member of the group at `group_thread_key`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupThreadIndex {
    pub group_thread_key: Pubkey,
    pub owner: Pubkey,
    pub group_name: String,
}

impl GroupThreadIndex {
    /// Byte offset of `owner` in the encoded account.
    pub const OWNER_OFFSET: usize = 1 + 32;
}

impl AccountState for GroupThreadIndex {
    const TAG: Tag = Tag::GroupThreadIndex;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_lookup() {
        let alice = Pubkey::new_from_array([1u8; 32]);
        let bob = Pubkey::new_from_array([2u8; 32]);
        let group = GroupThread {
            admins: vec![alice, bob],
            ..GroupThread::default()
        };

        assert_eq!(group.admin_index(&bob), Some(1));
        assert!(!group.is_admin(&Pubkey::new_from_array([3u8; 32])));
    }

    #[test]
    fn test_owner_offsets_match_layout() {
        let owner = Pubkey::new_from_array([8u8; 32]);
        let group = GroupThread {
            owner,
            ..GroupThread::default()
        }
        .encode()
        .unwrap();
        let index = GroupThreadIndex {
            group_thread_key: Pubkey::new_from_array([1u8; 32]),
            owner,
            group_name: "g".to_string(),
        }
        .encode()
        .unwrap();

        assert_eq!(
            &group[GroupThread::OWNER_OFFSET..GroupThread::OWNER_OFFSET + 32],
            owner.as_ref()
        );
        assert_eq!(
            &index[GroupThreadIndex::OWNER_OFFSET..GroupThreadIndex::OWNER_OFFSET + 32],
            owner.as_ref()
        );
    }
}
