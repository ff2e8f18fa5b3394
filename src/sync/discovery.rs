//! Finding a user's conversations and follows through program account queries.

use crate::account::{AccountState, GroupThreadIndex, Subscription, Thread};
use crate::rpc::{LedgerRpc, MemcmpFilter};
use crate::{Error, Pubkey};
use std::collections::BTreeMap;
use tracing::debug;

fn key_filters<T: AccountState>(offset: usize, key: &Pubkey) -> [MemcmpFilter; 2] {
    [
        MemcmpFilter::new(0, vec![T::TAG as u8]),
        MemcmpFilter::new(offset, key.to_bytes()),
    ]
}

fn decode_all<T: AccountState>(accounts: Vec<(Pubkey, Vec<u8>)>) -> Result<Vec<(Pubkey, T)>, Error> {
    accounts
        .into_iter()
        .map(|(address, data)| Ok((address, T::decode(&data)?)))
        .collect()
}

/// Every direct thread `user` takes part in, newest activity first.
///
/// Results of the `user_1` and `user_2` queries are merged and de-duplicated
/// by address, so repeated or overlapping answers yield each thread once.
pub async fn find_threads<R: LedgerRpc>(
    rpc: &R,
    program_id: &Pubkey,
    user: &Pubkey,
) -> Result<Vec<(Pubkey, Thread)>, Error> {
    let as_first = key_filters::<Thread>(Thread::USER_1_OFFSET, user);
    let as_second = key_filters::<Thread>(Thread::USER_2_OFFSET, user);
    let (first, second) = futures::try_join!(
        rpc.query_program_accounts(program_id, &as_first),
        rpc.query_program_accounts(program_id, &as_second),
    )?;

    let mut unique = BTreeMap::new();
    for (address, thread) in decode_all::<Thread>(first)?
        .into_iter()
        .chain(decode_all::<Thread>(second)?)
    {
        unique.entry(address).or_insert(thread);
    }
    debug!(%user, threads = unique.len(), "Discovered threads");

    let mut threads: Vec<(Pubkey, Thread)> = unique.into_iter().collect();
    threads.sort_by(|(a_key, a), (b_key, b)| {
        b.last_message_time
            .cmp(&a.last_message_time)
            .then_with(|| a_key.cmp(b_key))
    });
    Ok(threads)
}

/// Membership markers of every group `owner` joined.
pub async fn find_group_indexes<R: LedgerRpc>(
    rpc: &R,
    program_id: &Pubkey,
    owner: &Pubkey,
) -> Result<Vec<(Pubkey, GroupThreadIndex)>, Error> {
    let filters = key_filters::<GroupThreadIndex>(GroupThreadIndex::OWNER_OFFSET, owner);
    let accounts = rpc.query_program_accounts(program_id, &filters).await?;
    decode_all(accounts)
}

/// Accounts `subscriber` follows.
pub async fn find_subscriptions<R: LedgerRpc>(
    rpc: &R,
    program_id: &Pubkey,
    subscriber: &Pubkey,
) -> Result<Vec<(Pubkey, Subscription)>, Error> {
    let filters = key_filters::<Subscription>(Subscription::SUBSCRIBER_OFFSET, subscriber);
    let accounts = rpc.query_program_accounts(program_id, &filters).await?;
    decode_all(accounts)
}
