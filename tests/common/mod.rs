#![allow(dead_code)]

use quill::account::AccountState;
use quill::media::BlobStore;
use quill::rpc::{
    AccountNotification, LedgerRpc, MemcmpFilter, SubscriptionId, TransactionStatus,
};
use quill::{Error, Pubkey, Signature};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedSender;

pub fn program_id() -> Pubkey {
    Pubkey::new_from_array([42u8; 32])
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory ledger. Programs do not execute: tests write the accounts a
/// transaction would have produced with [`MemoryLedger::put`].
#[derive(Default)]
pub struct MemoryLedger {
    accounts: Mutex<BTreeMap<Pubkey, Vec<u8>>>,
    /// Every address requested through `get_accounts`, in request order.
    fetched: Mutex<Vec<Pubkey>>,
    get_accounts_calls: AtomicUsize,
    subscribers: Mutex<HashMap<u64, (Pubkey, UnboundedSender<AccountNotification>)>>,
    next_subscription: AtomicU64,
    submitted: Mutex<Vec<Vec<u8>>>,
    /// Scripted answers to `transaction_status`; `Confirmed` once exhausted.
    statuses: Mutex<VecDeque<Result<TransactionStatus, Error>>>,
    /// Scripted answers to `submit_transaction`; success once exhausted.
    submit_errors: Mutex<VecDeque<Error>>,
    /// Accounts written by another client, landing with the next status answer.
    racing_writes: Mutex<Vec<(Pubkey, Vec<u8>)>>,
}

impl MemoryLedger {
    pub fn put<T: AccountState>(&self, address: &Pubkey, account: &T) {
        self.put_raw(address, account.encode().unwrap());
    }

    pub fn put_raw(&self, address: &Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(*address, data);
    }

    pub fn remove(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    /// Pushes the current state of `address` to its subscribers.
    pub fn notify(&self, address: &Pubkey) {
        let data = self.accounts.lock().unwrap().get(address).cloned();
        for (id, (subscribed, sink)) in self.subscribers.lock().unwrap().iter() {
            if subscribed == address {
                let _ = sink.send(AccountNotification {
                    subscription: SubscriptionId(*id),
                    address: *address,
                    data: data.clone(),
                });
            }
        }
    }

    pub fn fetched(&self) -> Vec<Pubkey> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn clear_fetched(&self) {
        self.fetched.lock().unwrap().clear();
    }

    pub fn get_accounts_calls(&self) -> usize {
        self.get_accounts_calls.load(Ordering::SeqCst)
    }

    pub fn open_subscriptions(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = Result<TransactionStatus, Error>>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    /// Writes `account` at `address` when the next transaction status is
    /// answered, as if a concurrent transaction landed first.
    pub fn put_racing<T: AccountState>(&self, address: &Pubkey, account: &T) {
        self.racing_writes
            .lock()
            .unwrap()
            .push((*address, account.encode().unwrap()));
    }

    pub fn script_submit_errors(&self, errors: impl IntoIterator<Item = Error>) {
        self.submit_errors.lock().unwrap().extend(errors);
    }
}

impl LedgerRpc for MemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        self.get_accounts_calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().extend_from_slice(addresses);

        let accounts = self.accounts.lock().unwrap();
        Ok(addresses
            .iter()
            .map(|address| accounts.get(address).cloned())
            .collect())
    }

    async fn query_program_accounts(
        &self,
        _program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, data)| filters.iter().all(|filter| filter.matches(data)))
            .map(|(address, data)| (*address, data.clone()))
            .collect())
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], Error> {
        Ok([7u8; 32])
    }

    async fn submit_transaction(&self, transaction: &[u8]) -> Result<Signature, Error> {
        if let Some(err) = self.submit_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.submitted.lock().unwrap().push(transaction.to_vec());

        let bytes: [u8; 64] = transaction[1..65].try_into().unwrap();
        Ok(Signature::from_bytes(&bytes))
    }

    async fn transaction_status(&self, _signature: &Signature) -> Result<TransactionStatus, Error> {
        let racing: Vec<_> = self.racing_writes.lock().unwrap().drain(..).collect();
        self.accounts.lock().unwrap().extend(racing);

        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TransactionStatus::Confirmed))
    }

    async fn subscribe_account(
        &self,
        address: &Pubkey,
        sink: UnboundedSender<AccountNotification>,
    ) -> Result<SubscriptionId, Error> {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().unwrap().insert(id, (*address, sink));
        Ok(SubscriptionId(id))
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), Error> {
        self.subscribers.lock().unwrap().remove(&subscription.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, Error> {
        let hash = bs58::encode(Sha256::digest(&bytes)).into_string();
        self.blobs.lock().unwrap().insert(hash.clone(), bytes);
        Ok(hash)
    }

    async fn get(&self, hash: &str) -> Result<Vec<u8>, Error> {
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::Network(format!("No blob stored under {hash}")))
    }
}
