//! Group operations that depend on the group's current on-chain record.
//!
//! Every function takes the freshly fetched [`GroupThread`] so that admin
//! positions, toggles and posting rules are checked against what the program
//! will see.

use crate::account::{GroupThread, MessageKind};
use crate::instruction::{
    DeleteGroupMessageArgs, EditGroupThreadArgs, Instruction, MAX_ADMINS, SendMessageGroupArgs,
    add_admin_to_group, delete_group_message, edit_group_thread, remove_admin_from_group,
    send_message_group,
};
use crate::{Error, Pubkey};

fn check_owner(group: &GroupThread, owner: &Pubkey) -> Result<(), Error> {
    if group.owner != *owner {
        return Err(Error::invalid(format!(
            "{owner} does not own group {:?}",
            group.group_name
        )));
    }
    Ok(())
}

/// Adds `admin` to the group at `group_address`.
pub fn add_admin(
    program_id: &Pubkey,
    group_address: &Pubkey,
    group: &GroupThread,
    owner: &Pubkey,
    admin: &Pubkey,
) -> Result<Instruction, Error> {
    check_owner(group, owner)?;
    if group.is_admin(admin) {
        return Err(Error::invalid(format!("{admin} is already an admin")));
    }
    if group.admins.len() >= MAX_ADMINS {
        return Err(Error::invalid(format!(
            "A group holds at most {MAX_ADMINS} admins"
        )));
    }

    add_admin_to_group(program_id, group_address, owner, admin)
}

/// Removes `admin`, addressing it by its position in the admin vector.
pub fn remove_admin(
    program_id: &Pubkey,
    group_address: &Pubkey,
    group: &GroupThread,
    owner: &Pubkey,
    admin: &Pubkey,
) -> Result<Instruction, Error> {
    check_owner(group, owner)?;
    let index = group
        .admin_index(admin)
        .ok_or_else(|| Error::invalid(format!("{admin} is not an admin")))?;

    remove_admin_from_group(program_id, group_address, owner, admin, index)
}

/// Changes to a group's editable fields; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupEdit {
    pub visible: Option<bool>,
    pub owner: Option<Pubkey>,
    pub destination_wallet: Option<Pubkey>,
    pub lamports_per_message: Option<u64>,
    pub media_enabled: Option<bool>,
    pub admin_only: Option<bool>,
    pub group_pic_hash: Option<String>,
}

impl GroupEdit {
    /// Full argument set for an edit of `current`.
    pub fn merge(&self, current: &GroupThread) -> EditGroupThreadArgs {
        EditGroupThreadArgs {
            visible: self.visible.unwrap_or(current.visible),
            owner: self.owner.unwrap_or(current.owner),
            destination_wallet: self.destination_wallet.unwrap_or(current.destination_wallet),
            lamports_per_message: self
                .lamports_per_message
                .unwrap_or(current.lamports_per_message),
            media_enabled: self.media_enabled.unwrap_or(current.media_enabled),
            admin_only: self.admin_only.unwrap_or(current.admin_only),
            group_pic_hash: self
                .group_pic_hash
                .clone()
                .unwrap_or_else(|| current.group_pic_hash.clone()),
        }
    }
}

/// Applies `edit` on top of `group`, leaving every other field as it is.
pub fn edit_group(
    program_id: &Pubkey,
    group_address: &Pubkey,
    group: &GroupThread,
    owner: &Pubkey,
    edit: &GroupEdit,
) -> Result<Instruction, Error> {
    check_owner(group, owner)?;
    edit_group_thread(program_id, group_address, owner, &edit.merge(group))
}

/// Builds a post of `message` to `group` as its next message.
///
/// Admin senders pass their admin index along. Group messages are stored in
/// the clear, so encrypted kinds are refused.
pub fn prepare_group_message(
    program_id: &Pubkey,
    group_address: &Pubkey,
    group: &GroupThread,
    sender: &Pubkey,
    kind: MessageKind,
    message: Vec<u8>,
    replies_to: Option<Pubkey>,
) -> Result<Instruction, Error> {
    if kind.is_encrypted() {
        return Err(Error::invalid("Group messages cannot be encrypted"));
    }
    if kind.is_media() && !group.media_enabled {
        return Err(Error::invalid(format!(
            "Group {:?} does not accept media",
            group.group_name
        )));
    }

    let admin_index = group.admin_index(sender);
    if group.admin_only && admin_index.is_none() && group.owner != *sender {
        return Err(Error::invalid(format!(
            "Only admins may post in group {:?}",
            group.group_name
        )));
    }

    send_message_group(
        program_id,
        sender,
        group_address,
        &group.destination_wallet,
        group.msg_count,
        &SendMessageGroupArgs {
            kind,
            message,
            group_name: group.group_name.clone(),
            admin_index: admin_index.map(|index| index as u64),
            replies_to,
        },
    )
}

/// Deletes message `message_index` from `group` on behalf of `sender`.
pub fn prepare_group_delete(
    program_id: &Pubkey,
    group_address: &Pubkey,
    group: &GroupThread,
    sender: &Pubkey,
    message_index: u32,
) -> Result<Instruction, Error> {
    if message_index >= group.msg_count {
        return Err(Error::invalid(format!(
            "Group {:?} has no message {message_index}",
            group.group_name
        )));
    }

    delete_group_message(
        program_id,
        sender,
        group_address,
        &DeleteGroupMessageArgs {
            message_index,
            group_name: group.group_name.clone(),
            owner: group.owner,
            admin_index: group.admin_index(sender).map(|index| index as u64),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstructionTag, RemoveAdminFromGroupArgs};
    use borsh::BorshDeserialize;

    fn program_id() -> Pubkey {
        Pubkey::new_from_array([42u8; 32])
    }

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    fn group() -> GroupThread {
        GroupThread {
            owner: key(1),
            destination_wallet: key(1),
            msg_count: 7,
            lamports_per_message: 10,
            visible: true,
            media_enabled: false,
            admin_only: false,
            group_name: "crabs".to_string(),
            group_pic_hash: "Qm123".to_string(),
            admins: vec![key(2), key(3)],
            ..GroupThread::default()
        }
    }

    #[test]
    fn test_add_existing_admin_fails() {
        let result = add_admin(&program_id(), &key(9), &group(), &key(1), &key(3));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        assert!(add_admin(&program_id(), &key(9), &group(), &key(1), &key(4)).is_ok());
    }

    #[test]
    fn test_remove_admin_uses_index() {
        let instruction = remove_admin(&program_id(), &key(9), &group(), &key(1), &key(3)).unwrap();
        assert_eq!(instruction.tag(), Some(InstructionTag::RemoveAdminFromGroup));

        let args = RemoveAdminFromGroupArgs::try_from_slice(&instruction.data[1..]).unwrap();
        assert_eq!(args.admin, key(3));
        assert_eq!(args.admin_index, 1);
    }

    #[test]
    fn test_remove_missing_admin_fails() {
        let group = group();
        let result = remove_admin(&program_id(), &key(9), &group, &key(1), &key(5));

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(group.admins, vec![key(2), key(3)]);
    }

    #[test]
    fn test_only_owner_manages_admins() {
        let result = add_admin(&program_id(), &key(9), &group(), &key(2), &key(4));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_edit_preserves_unspecified_fields() {
        let current = group();
        let edit = GroupEdit {
            media_enabled: Some(true),
            ..GroupEdit::default()
        };

        let args = edit.merge(&current);
        assert!(args.media_enabled);
        assert!(args.visible);
        assert!(!args.admin_only);
        assert_eq!(args.lamports_per_message, 10);
        assert_eq!(args.group_pic_hash, "Qm123");
        assert_eq!(args.owner, key(1));
    }

    #[test]
    fn test_admin_sender_passes_index() {
        let instruction = prepare_group_message(
            &program_id(),
            &key(9),
            &group(),
            &key(3),
            MessageKind::Unencrypted,
            b"gm".to_vec(),
            None,
        )
        .unwrap();

        let args = SendMessageGroupArgs::try_from_slice(&instruction.data[1..]).unwrap();
        assert_eq!(args.admin_index, Some(1));
        assert_eq!(args.group_name, "crabs");
    }

    #[test]
    fn test_posting_rules() {
        let mut group = group();
        let post = |group: &GroupThread, sender: u8, kind: MessageKind| {
            prepare_group_message(
                &program_id(),
                &key(9),
                group,
                &key(sender),
                kind,
                b"gm".to_vec(),
                None,
            )
        };

        assert!(post(&group, 5, MessageKind::Encrypted).is_err());
        assert!(post(&group, 5, MessageKind::UnencryptedMedia).is_err());

        group.media_enabled = true;
        assert!(post(&group, 5, MessageKind::UnencryptedMedia).is_ok());

        group.admin_only = true;
        assert!(post(&group, 5, MessageKind::Unencrypted).is_err());
        assert!(post(&group, 2, MessageKind::Unencrypted).is_ok());
        assert!(post(&group, 1, MessageKind::Unencrypted).is_ok());
    }

    #[test]
    fn test_group_delete_carries_admin_index() {
        let instruction = prepare_group_delete(&program_id(), &key(9), &group(), &key(2), 4).unwrap();
        assert_eq!(instruction.tag(), Some(InstructionTag::DeleteGroupMessage));

        let args = DeleteGroupMessageArgs::try_from_slice(&instruction.data[1..]).unwrap();
        assert_eq!(args.message_index, 4);
        assert_eq!(args.owner, key(1));
        assert_eq!(args.admin_index, Some(0));

        let result = prepare_group_delete(&program_id(), &key(9), &group(), &key(2), 7);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
