//! The ledger RPC surface this crate consumes.
//!
//! Implemented outside the crate (HTTP/WebSocket client, test fake, ...).
//! Every method is a suspension point; nothing else in the crate blocks.

use crate::{Error, Pubkey};
use ed25519_dalek::Signature;
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc::UnboundedSender;

/// Matches accounts whose data contains `bytes` at `offset`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Returns true if `data` satisfies the filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

/// Handle returned by [`LedgerRpc::subscribe_account`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Pushed by the ledger when a subscribed account changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountNotification {
    pub subscription: SubscriptionId,
    pub address: Pubkey,
    /// New account data, or `None` if the account was closed.
    pub data: Option<Vec<u8>>,
}

/// Why the ledger refused a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionFailure {
    /// An account the transaction tried to create already exists.
    AccountInUse,
    /// Any other program or runtime error.
    Program(String),
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountInUse => f.write_str("account already in use"),
            Self::Program(reason) => f.write_str(reason),
        }
    }
}

/// Confirmation state of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Unknown to the ledger or not yet confirmed.
    Pending,
    Confirmed,
    Failed(TransactionFailure),
}

/// Read, write and subscribe access to the ledger.
pub trait LedgerRpc: Sync {
    /// Fetches one account's data, `None` if it does not exist.
    fn get_account(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Error>> + Send;

    /// Fetches several accounts; the result is aligned with `addresses`.
    fn get_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>, Error>> + Send;

    /// Lists accounts owned by `program_id` that satisfy every filter.
    fn query_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> impl Future<Output = Result<Vec<(Pubkey, Vec<u8>)>, Error>> + Send;

    /// Hash of a recent block, required by every transaction.
    fn latest_blockhash(&self) -> impl Future<Output = Result<[u8; 32], Error>> + Send;

    /// Sends a signed, serialized transaction. Resubmitting the same bytes is harmless.
    fn submit_transaction(
        &self,
        transaction: &[u8],
    ) -> impl Future<Output = Result<Signature, Error>> + Send;

    /// Looks up the confirmation state of a submitted transaction.
    fn transaction_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<TransactionStatus, Error>> + Send;

    /// Streams changes to `address` into `sink` until unsubscribed.
    fn subscribe_account(
        &self,
        address: &Pubkey,
        sink: UnboundedSender<AccountNotification>,
    ) -> impl Future<Output = Result<SubscriptionId, Error>> + Send;

    fn unsubscribe(&self, subscription: SubscriptionId)
    -> impl Future<Output = Result<(), Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcmp_filter() {
        let filter = MemcmpFilter::new(2, vec![7, 8]);

        assert!(filter.matches(&[0, 0, 7, 8, 9]));
        assert!(!filter.matches(&[0, 0, 7, 9]));
        assert!(!filter.matches(&[0, 0, 7]));
    }
}
