use super::{
    AccountMeta, Instruction, InstructionTag, SYSTEM_PROGRAM_ID, check_group_name, check_message,
    check_text,
};
use crate::account::{MAX_PICTURE_HASH_LEN, MessageKind};
use crate::address::{group_index_address, group_message_address, group_thread_address};
use crate::{Error, Pubkey};
use borsh::{BorshDeserialize, BorshSerialize};

/// Most admins a group may hold.
pub const MAX_ADMINS: usize = 50;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateGroupThreadArgs {
    pub group_name: String,
    pub destination_wallet: Pubkey,
    pub lamports_per_message: u64,
    pub admins: Vec<Pubkey>,
    pub owner: Pubkey,
    pub media_enabled: bool,
    pub admin_only: bool,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EditGroupThreadArgs {
    pub visible: bool,
    pub owner: Pubkey,
    pub destination_wallet: Pubkey,
    pub lamports_per_message: u64,
    pub media_enabled: bool,
    pub admin_only: bool,
    pub group_pic_hash: String,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddAdminToGroupArgs {
    pub admin: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoveAdminFromGroupArgs {
    pub admin: Pubkey,
    pub admin_index: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateGroupIndexArgs {
    pub group_name: String,
    pub group_thread_key: Pubkey,
    pub owner: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SendMessageGroupArgs {
    pub kind: MessageKind,
    pub message: Vec<u8>,
    pub group_name: String,
    /// Sender's position in the admin vector, when the sender is an admin.
    pub admin_index: Option<u64>,
    pub replies_to: Option<Pubkey>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeleteGroupMessageArgs {
    pub message_index: u32,
    pub group_name: String,
    pub owner: Pubkey,
    pub admin_index: Option<u64>,
}

/// Creates a group named `args.group_name` owned by `args.owner`.
pub fn create_group_thread(
    program_id: &Pubkey,
    fee_payer: &Pubkey,
    args: &CreateGroupThreadArgs,
) -> Result<Instruction, Error> {
    check_group_name(&args.group_name)?;
    if args.admins.len() > MAX_ADMINS {
        return Err(Error::invalid(format!(
            "A group holds at most {MAX_ADMINS} admins"
        )));
    }

    let (group_thread, _) = group_thread_address(program_id, &args.group_name, &args.owner)?;

    Instruction::build(
        program_id,
        InstructionTag::CreateGroupThread,
        args,
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(group_thread, false),
            AccountMeta::new(*fee_payer, true),
        ],
    )
}

/// Overwrites every editable field of the group at `group_thread`.
///
/// Fields the caller does not mean to change must carry their current values.
pub fn edit_group_thread(
    program_id: &Pubkey,
    group_thread: &Pubkey,
    owner: &Pubkey,
    args: &EditGroupThreadArgs,
) -> Result<Instruction, Error> {
    check_text("Group picture hash", &args.group_pic_hash, MAX_PICTURE_HASH_LEN)?;

    Instruction::build(
        program_id,
        InstructionTag::EditGroupThread,
        args,
        vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*group_thread, false),
        ],
    )
}

pub fn add_admin_to_group(
    program_id: &Pubkey,
    group_thread: &Pubkey,
    owner: &Pubkey,
    admin: &Pubkey,
) -> Result<Instruction, Error> {
    Instruction::build(
        program_id,
        InstructionTag::AddAdminToGroup,
        &AddAdminToGroupArgs { admin: *admin },
        vec![
            AccountMeta::new(*group_thread, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

/// Removes the admin at `admin_index`; `admin` is checked against it on-chain.
pub fn remove_admin_from_group(
    program_id: &Pubkey,
    group_thread: &Pubkey,
    owner: &Pubkey,
    admin: &Pubkey,
    admin_index: usize,
) -> Result<Instruction, Error> {
    Instruction::build(
        program_id,
        InstructionTag::RemoveAdminFromGroup,
        &RemoveAdminFromGroupArgs {
            admin: *admin,
            admin_index: admin_index as u64,
        },
        vec![
            AccountMeta::new(*group_thread, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

/// Creates `owner`'s membership marker for the group at `group_thread`.
pub fn create_group_index(
    program_id: &Pubkey,
    fee_payer: &Pubkey,
    group_name: &str,
    group_thread: &Pubkey,
    owner: &Pubkey,
) -> Result<Instruction, Error> {
    check_group_name(group_name)?;

    let (group_index, _) = group_index_address(program_id, group_name, owner, group_thread)?;

    Instruction::build(
        program_id,
        InstructionTag::CreateGroupIndex,
        &CreateGroupIndexArgs {
            group_name: group_name.to_string(),
            group_thread_key: *group_thread,
            owner: *owner,
        },
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(group_index, false),
            AccountMeta::new(*fee_payer, true),
        ],
    )
}

/// Posts message `message_index` to the group at `group_thread`.
///
/// `message_index` must be the group's current message count.
pub fn send_message_group(
    program_id: &Pubkey,
    sender: &Pubkey,
    group_thread: &Pubkey,
    destination_wallet: &Pubkey,
    message_index: u32,
    args: &SendMessageGroupArgs,
) -> Result<Instruction, Error> {
    check_group_name(&args.group_name)?;
    check_message(&args.message)?;
    if args.kind.is_encrypted() {
        return Err(Error::invalid("Group messages cannot be encrypted"));
    }

    let (message, _) = group_message_address(program_id, message_index, group_thread)?;

    Instruction::build(
        program_id,
        InstructionTag::SendMessageGroup,
        args,
        vec![
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new(*sender, true),
            AccountMeta::new(*group_thread, false),
            AccountMeta::new(*destination_wallet, false),
            AccountMeta::new(message, false),
        ],
    )
}

/// Deletes message `args.message_index` from the group at `group_thread`.
pub fn delete_group_message(
    program_id: &Pubkey,
    sender: &Pubkey,
    group_thread: &Pubkey,
    args: &DeleteGroupMessageArgs,
) -> Result<Instruction, Error> {
    check_group_name(&args.group_name)?;

    let (message, _) = group_message_address(program_id, args.message_index, group_thread)?;

    Instruction::build(
        program_id,
        InstructionTag::DeleteGroupMessage,
        args,
        vec![
            AccountMeta::new(*sender, true),
            AccountMeta::new_readonly(*group_thread, false),
            AccountMeta::new(message, false),
        ],
    )
}
