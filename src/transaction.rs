//! Legacy ledger transactions: compile instructions, sign, serialize.
//!
//! Wire format: `[sig count][signatures][message]`, where the message is
//! `[header: 3 bytes][key count][keys][recent blockhash][ix count][instructions]`
//! and every count is a compact-u16. Keys are ordered writable signers,
//! read-only signers, writable non-signers, read-only non-signers, with the
//! fee payer first.

use crate::instruction::Instruction;
use crate::{Error, Keypair, Pubkey};
use ed25519_dalek::Signature;

/// Largest serialized transaction the ledger accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

fn write_compact_u16(out: &mut Vec<u8>, value: usize) -> Result<(), Error> {
    let mut value = u16::try_from(value)
        .map_err(|_| Error::invalid(format!("Length {value} does not fit a compact-u16")))?;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

fn index_of(keys: &[Pubkey], key: &Pubkey) -> Result<u8, Error> {
    let index = keys
        .iter()
        .position(|candidate| candidate == key)
        .ok_or_else(|| Error::invalid(format!("{key} missing from the key table")))?;
    u8::try_from(index).map_err(|_| Error::invalid("Transaction references too many accounts"))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionMessage {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Clone, Copy)]
struct KeyFlags {
    key: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl TransactionMessage {
    /// Builds the key table and compiles `instructions` against it.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: [u8; 32],
    ) -> Result<Self, Error> {
        let mut flags: Vec<KeyFlags> = vec![KeyFlags {
            key: *payer,
            is_signer: true,
            is_writable: true,
        }];

        let mut upsert = |key: Pubkey, is_signer: bool, is_writable: bool| {
            if let Some(existing) = flags.iter_mut().find(|entry| entry.key == key) {
                existing.is_signer |= is_signer;
                existing.is_writable |= is_writable;
            } else {
                flags.push(KeyFlags {
                    key,
                    is_signer,
                    is_writable,
                });
            }
        };

        for instruction in instructions {
            for meta in &instruction.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(instruction.program_id, false, false);
        }

        // Stable sort keeps the payer first and first-seen order within a class.
        flags.sort_by_key(|entry| (!entry.is_signer, !entry.is_writable));

        let count = |predicate: fn(&KeyFlags) -> bool| -> Result<u8, Error> {
            u8::try_from(flags.iter().filter(|entry| predicate(entry)).count())
                .map_err(|_| Error::invalid("Transaction references too many accounts"))
        };
        let header = MessageHeader {
            num_required_signatures: count(|entry| entry.is_signer)?,
            num_readonly_signed_accounts: count(|entry| entry.is_signer && !entry.is_writable)?,
            num_readonly_unsigned_accounts: count(|entry| !entry.is_signer && !entry.is_writable)?,
        };

        let account_keys: Vec<Pubkey> = flags.iter().map(|entry| entry.key).collect();
        let instructions = instructions
            .iter()
            .map(|instruction| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&account_keys, &instruction.program_id)?,
                    accounts: instruction
                        .accounts
                        .iter()
                        .map(|meta| index_of(&account_keys, &meta.pubkey))
                        .collect::<Result<_, Error>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect::<Result<_, Error>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Keys whose signatures the transaction needs, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..usize::from(self.header.num_required_signatures)]
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];

        write_compact_u16(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_ref());
        }
        out.extend_from_slice(&self.recent_blockhash);

        write_compact_u16(&mut out, self.instructions.len())?;
        for instruction in &self.instructions {
            out.push(instruction.program_id_index);
            write_compact_u16(&mut out, instruction.accounts.len())?;
            out.extend_from_slice(&instruction.accounts);
            write_compact_u16(&mut out, instruction.data.len())?;
            out.extend_from_slice(&instruction.data);
        }

        Ok(out)
    }
}

/// A fully signed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: TransactionMessage,
}

impl Transaction {
    /// Compiles and signs `instructions`; `signers` must cover every signer key.
    pub fn new_signed(
        payer: &Keypair,
        instructions: &[Instruction],
        signers: &[&Keypair],
        recent_blockhash: [u8; 32],
    ) -> Result<Self, Error> {
        let message = TransactionMessage::compile(&payer.pubkey(), instructions, recent_blockhash)?;
        let message_bytes = message.serialize()?;

        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                std::iter::once(payer)
                    .chain(signers.iter().copied())
                    .find(|keypair| keypair.pubkey() == *key)
                    .map(|keypair| keypair.sign(&message_bytes))
                    .ok_or_else(|| Error::invalid(format!("Missing signer {key}")))
            })
            .collect::<Result<_, Error>>()?;

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Signature identifying the transaction on the ledger.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(PACKET_DATA_SIZE);
        write_compact_u16(&mut out, self.signatures.len())?;
        for signature in &self.signatures {
            out.extend_from_slice(&signature.to_bytes());
        }
        out.extend_from_slice(&self.message.serialize()?);

        if out.len() > PACKET_DATA_SIZE {
            return Err(Error::invalid(format!(
                "Transaction is {} bytes, the limit is {PACKET_DATA_SIZE}",
                out.len()
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{AccountMeta, create_thread};

    #[test]
    fn test_compact_u16() {
        let cases: [(usize, &[u8]); 5] = [
            (0, &[0x00]),
            (0x7f, &[0x7f]),
            (0x80, &[0x80, 0x01]),
            (0x3fff, &[0xff, 0x7f]),
            (0x4000, &[0x80, 0x80, 0x01]),
        ];
        for (value, expected) in cases {
            let mut out = Vec::new();
            write_compact_u16(&mut out, value).unwrap();
            assert_eq!(out, expected);
        }
        assert!(write_compact_u16(&mut Vec::new(), 70_000).is_err());
    }

    #[test]
    fn test_key_ordering_and_header() {
        let payer = Pubkey::new_from_array([9u8; 32]);
        let program = Pubkey::new_from_array([4u8; 32]);
        let readonly_signer = Pubkey::new_from_array([1u8; 32]);
        let writable = Pubkey::new_from_array([2u8; 32]);
        let readonly = Pubkey::new_from_array([3u8; 32]);

        let instruction = Instruction {
            program_id: program,
            accounts: vec![
                AccountMeta::new_readonly(readonly, false),
                AccountMeta::new(writable, false),
                AccountMeta::new_readonly(readonly_signer, true),
            ],
            data: vec![1, 2, 3],
        };
        let message = TransactionMessage::compile(&payer, &[instruction], [0u8; 32]).unwrap();

        assert_eq!(
            message.account_keys,
            vec![payer, readonly_signer, writable, readonly, program]
        );
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 2,
            }
        );
        assert_eq!(message.instructions[0].program_id_index, 4);
        assert_eq!(message.instructions[0].accounts, vec![3, 2, 1]);
    }

    #[test]
    fn test_signatures_verify() {
        let payer = Keypair::new().unwrap();
        let other = Pubkey::new_from_array([7u8; 32]);
        let program = Pubkey::new_from_array([4u8; 32]);
        let instruction = create_thread(&program, &payer.pubkey(), &other, &payer.pubkey()).unwrap();

        let transaction = Transaction::new_signed(&payer, &[instruction], &[], [5u8; 32]).unwrap();
        let message_bytes = transaction.message.serialize().unwrap();

        assert_eq!(transaction.signatures.len(), 1);
        assert!(
            Keypair::verify(&payer.pubkey(), &message_bytes, &transaction.signatures[0]).is_ok()
        );

        let wire = transaction.serialize().unwrap();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], transaction.signatures[0].to_bytes().as_slice());
    }

    #[test]
    fn test_missing_signer_is_rejected() {
        let payer = Keypair::new().unwrap();
        let absent = Keypair::new().unwrap();
        let instruction = Instruction {
            program_id: Pubkey::new_from_array([4u8; 32]),
            accounts: vec![AccountMeta::new(absent.pubkey(), true)],
            data: vec![],
        };

        assert!(matches!(
            Transaction::new_signed(&payer, &[instruction], &[], [0u8; 32]),
            Err(Error::InvalidInput(_))
        ));
    }
}
