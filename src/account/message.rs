use super::{AccountState, Tag};
use crate::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

/// Warning shown next to group conversations, whose messages are stored in the clear.
pub const GROUP_CONFIDENTIALITY_WARNING: &str =
    "Group messages are not end-to-end encrypted. Anyone reading the ledger can see them.";

/// How a message payload is stored.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Ciphertext of a text body.
    Encrypted,
    /// Plain text body.
    Unencrypted,
    /// Ciphertext of a blob store hash.
    EncryptedMedia,
    /// Plain blob store hash.
    UnencryptedMedia,
}

impl MessageKind {
    pub fn is_encrypted(self) -> bool {
        matches!(self, Self::Encrypted | Self::EncryptedMedia)
    }

    pub fn is_media(self) -> bool {
        matches!(self, Self::EncryptedMedia | Self::UnencryptedMedia)
    }
}

/// Who can read a message body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confidentiality {
    /// Only the two thread participants can decrypt the body.
    EndToEnd,
    /// Every observer of the ledger can read the body.
    Public,
}

impl Confidentiality {
    /// User-facing warning for bodies that are not encrypted.
    pub fn warning(self) -> Option<&'static str> {
        match self {
            Self::EndToEnd => None,
            Self::Public => Some(GROUP_CONFIDENTIALITY_WARNING),
        }
    }
}

/// A single immutable message in a thread or group.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub timestamp: i64,
    pub sender: Pubkey,
    /// Address of the message this one answers.
    pub replies_to: Option<Pubkey>,
    pub likes: u16,
    pub dislikes: u16,
    /// Ciphertext or plaintext, depending on `kind`.
    pub msg: Vec<u8>,
}

impl Message {
    pub fn confidentiality(&self) -> Confidentiality {
        if self.kind.is_encrypted() {
            Confidentiality::EndToEnd
        } else {
            Confidentiality::Public
        }
    }
}

impl AccountState for Message {
    const TAG: Tag = Tag::Message;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_single_byte() {
        let message = Message {
            kind: MessageKind::UnencryptedMedia,
            timestamp: 0,
            sender: Pubkey::default(),
            replies_to: None,
            likes: 0,
            dislikes: 0,
            msg: Vec::new(),
        };
        let bytes = message.encode().unwrap();

        assert_eq!(bytes[1], 3);
        // tag + kind + timestamp + sender + none flag + likes + dislikes + empty vec
        assert_eq!(bytes.len(), 1 + 1 + 8 + 32 + 1 + 2 + 2 + 4);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut bytes = Message {
            kind: MessageKind::Encrypted,
            timestamp: 0,
            sender: Pubkey::default(),
            replies_to: None,
            likes: 0,
            dislikes: 0,
            msg: vec![1],
        }
        .encode()
        .unwrap();
        bytes[1] = 9;

        assert!(Message::decode(&bytes).is_err());
    }

    #[test]
    fn test_plaintext_kinds_carry_a_warning() {
        let mut message = Message {
            kind: MessageKind::Unencrypted,
            timestamp: 0,
            sender: Pubkey::default(),
            replies_to: None,
            likes: 0,
            dislikes: 0,
            msg: b"gm".to_vec(),
        };
        assert_eq!(
            message.confidentiality().warning(),
            Some(GROUP_CONFIDENTIALITY_WARNING)
        );

        message.kind = MessageKind::EncryptedMedia;
        assert_eq!(message.confidentiality(), Confidentiality::EndToEnd);
        assert_eq!(message.confidentiality().warning(), None);
    }
}
