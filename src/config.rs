use crate::Pubkey;
use std::time::Duration;

/// How long and how often to resubmit a transaction while waiting for confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first resubmission.
    pub interval: Duration,
    /// Factor applied to the wait after every resubmission.
    pub backoff: u32,
    /// Upper bound on the wait between resubmissions.
    pub max_interval: Duration,
    /// Give up and report a timeout after this long.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            backoff: 2,
            max_interval: Duration::from_secs(8),
            deadline: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// The messaging program every address is derived under.
    pub program_id: Pubkey,
    /// Most messages fetched in one synchronization pass; older ones are skipped.
    pub max_sync_window: u32,
    /// Most addresses sent in a single `get_accounts` call.
    pub rpc_batch_limit: usize,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            max_sync_window: 20,
            rpc_batch_limit: 100,
            retry: RetryPolicy::default(),
        }
    }
}
