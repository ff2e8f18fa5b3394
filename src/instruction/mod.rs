//! Instruction builders.
//!
//! Each builder maps one domain operation onto the program's wire format:
//! a fixed, ordered list of account references plus a payload made of one
//! discriminant byte and the Borsh-encoded arguments. Builders only derive
//! addresses that are pure functions of their inputs; anything that needs a
//! fetch (a thread's message count, a group's admin list) is passed in.

mod group;
pub use group::*;

use crate::account::{MAX_BIO_LEN, MAX_GROUP_NAME_LEN, MAX_PICTURE_HASH_LEN, MessageKind};
use crate::address::{
    canonical_pair, message_address, profile_address, subscription_address, thread_address,
};
use crate::{Error, Pubkey};
use borsh::{BorshDeserialize, BorshSerialize};

/// Id of the ledger's system program, passed to every instruction that allocates.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// Largest message body the program stores.
pub const MAX_MESSAGE_LEN: usize = 1_000;

/// Longest display name reference.
pub const MAX_DISPLAY_NAME_LEN: usize = 64;

/// A reference to an account used by an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A request to the messaging program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    /// Account references. Order is fixed per operation.
    pub accounts: Vec<AccountMeta>,
    /// Discriminant byte followed by the encoded arguments.
    pub data: Vec<u8>,
}

/// First byte of every instruction payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstructionTag {
    CreateProfile = 0,
    CreateThread = 1,
    SetUserProfile = 2,
    SendMessage = 3,
    CreateGroupThread = 4,
    EditGroupThread = 5,
    AddAdminToGroup = 6,
    RemoveAdminFromGroup = 7,
    CreateGroupIndex = 8,
    SendMessageGroup = 9,
    DeleteMessage = 10,
    DeleteGroupMessage = 11,
    CreateSubscription = 12,
}

impl Instruction {
    pub(crate) fn build<T: BorshSerialize>(
        program_id: &Pubkey,
        tag: InstructionTag,
        args: &T,
        accounts: Vec<AccountMeta>,
    ) -> Result<Self, Error> {
        let mut data = vec![tag as u8];
        args.serialize(&mut data)
            .map_err(|err| Error::Serde(format!("Failed to encode {tag:?} arguments: {err}")))?;

        Ok(Self {
            program_id: *program_id,
            accounts,
            data,
        })
    }

    /// Returns the operation this instruction encodes, if the tag is known.
    pub fn tag(&self) -> Option<InstructionTag> {
        let tag = *self.data.first()?;
        ALL_TAGS.iter().copied().find(|known| *known as u8 == tag)
    }
}

const ALL_TAGS: [InstructionTag; 13] = [
    InstructionTag::CreateProfile,
    InstructionTag::CreateThread,
    InstructionTag::SetUserProfile,
    InstructionTag::SendMessage,
    InstructionTag::CreateGroupThread,
    InstructionTag::EditGroupThread,
    InstructionTag::AddAdminToGroup,
    InstructionTag::RemoveAdminFromGroup,
    InstructionTag::CreateGroupIndex,
    InstructionTag::SendMessageGroup,
    InstructionTag::DeleteMessage,
    InstructionTag::DeleteGroupMessage,
    InstructionTag::CreateSubscription,
];

pub(crate) fn check_text(field: &str, value: &str, max_len: usize) -> Result<(), Error> {
    if value.len() > max_len {
        return Err(Error::invalid(format!(
            "{field} is {} bytes, the limit is {max_len}",
            value.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_group_name(group_name: &str) -> Result<(), Error> {
    if group_name.is_empty() {
        return Err(Error::invalid("Group name cannot be empty"));
    }
    check_text("Group name", group_name, MAX_GROUP_NAME_LEN)
}

pub(crate) fn check_message(message: &[u8]) -> Result<(), Error> {
    if message.is_empty() {
        return Err(Error::invalid("Message cannot be empty"));
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(Error::invalid(format!(
            "Message is {} bytes, the limit is {MAX_MESSAGE_LEN}",
            message.len()
        )));
    }
    Ok(())
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateProfileArgs {
    pub picture_hash: String,
    pub display_domain_name: String,
    pub bio: String,
    pub lamports_per_message: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateThreadArgs {
    pub user_1: Pubkey,
    pub user_2: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SetUserProfileArgs {
    pub lamports_per_message: u64,
    pub allow_dm: bool,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SendMessageArgs {
    pub kind: MessageKind,
    pub message: Vec<u8>,
    pub replies_to: Option<Pubkey>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeleteMessageArgs {
    pub message_index: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateSubscriptionArgs {}

/// Creates `owner`'s profile.
pub fn create_profile(
    program_id: &Pubkey,
    owner: &Pubkey,
    args: &CreateProfileArgs,
) -> Result<Instruction, Error> {
    check_text("Picture hash", &args.picture_hash, MAX_PICTURE_HASH_LEN)?;
    check_text("Display name", &args.display_domain_name, MAX_DISPLAY_NAME_LEN)?;
    check_text("Bio", &args.bio, MAX_BIO_LEN)?;

    let (profile, _) = profile_address(program_id, owner)?;

    Instruction::build(
        program_id,
        InstructionTag::CreateProfile,
        args,
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(*owner, true),
            AccountMeta::new(profile, false),
        ],
    )
}

/// Creates the direct thread between `a` and `b`.
pub fn create_thread(
    program_id: &Pubkey,
    a: &Pubkey,
    b: &Pubkey,
    fee_payer: &Pubkey,
) -> Result<Instruction, Error> {
    if a == b {
        return Err(Error::invalid("A thread needs two distinct participants"));
    }

    let (thread, _) = thread_address(program_id, a, b)?;
    let (user_1, user_2) = canonical_pair(a, b);

    Instruction::build(
        program_id,
        InstructionTag::CreateThread,
        &CreateThreadArgs { user_1, user_2 },
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(thread, false),
            AccountMeta::new(*fee_payer, true),
        ],
    )
}

/// Updates the fee and DM settings of `owner`'s profile.
pub fn set_user_profile(
    program_id: &Pubkey,
    owner: &Pubkey,
    args: &SetUserProfileArgs,
) -> Result<Instruction, Error> {
    let (profile, _) = profile_address(program_id, owner)?;

    Instruction::build(
        program_id,
        InstructionTag::SetUserProfile,
        args,
        vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(profile, false),
        ],
    )
}

/// Sends message number `message_index` of `thread` from `sender` to `receiver`.
///
/// `message_index` must be the thread's current message count.
pub fn send_message(
    program_id: &Pubkey,
    sender: &Pubkey,
    receiver: &Pubkey,
    thread: &Pubkey,
    message_index: u32,
    args: &SendMessageArgs,
) -> Result<Instruction, Error> {
    if sender == receiver {
        return Err(Error::invalid("Sender and receiver must differ"));
    }
    check_message(&args.message)?;

    let (receiver_profile, _) = profile_address(program_id, receiver)?;
    let (message, _) = message_address(program_id, message_index, sender, receiver)?;

    Instruction::build(
        program_id,
        InstructionTag::SendMessage,
        args,
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(*sender, true),
            AccountMeta::new(*receiver, false),
            AccountMeta::new(*thread, false),
            AccountMeta::new_readonly(receiver_profile, false),
            AccountMeta::new(message, false),
        ],
    )
}

/// Deletes message `message_index` that `sender` sent to `receiver`.
pub fn delete_message(
    program_id: &Pubkey,
    sender: &Pubkey,
    receiver: &Pubkey,
    message_index: u32,
) -> Result<Instruction, Error> {
    let (message, _) = message_address(program_id, message_index, sender, receiver)?;

    Instruction::build(
        program_id,
        InstructionTag::DeleteMessage,
        &DeleteMessageArgs { message_index },
        vec![
            AccountMeta::new(*sender, true),
            AccountMeta::new_readonly(*receiver, false),
            AccountMeta::new(message, false),
        ],
    )
}

/// Records that `subscriber` follows `subscribed_to`.
pub fn create_subscription(
    program_id: &Pubkey,
    subscriber: &Pubkey,
    subscribed_to: &Pubkey,
) -> Result<Instruction, Error> {
    if subscriber == subscribed_to {
        return Err(Error::invalid("Cannot subscribe to yourself"));
    }

    let (subscription, _) = subscription_address(program_id, subscriber, subscribed_to)?;

    Instruction::build(
        program_id,
        InstructionTag::CreateSubscription,
        &CreateSubscriptionArgs::default(),
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(*subscriber, true),
            AccountMeta::new_readonly(*subscribed_to, false),
            AccountMeta::new(subscription, false),
        ],
    )
}
