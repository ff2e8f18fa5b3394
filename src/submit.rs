use crate::rpc::{LedgerRpc, TransactionStatus};
use crate::{Error, RetryPolicy};
use ed25519_dalek::Signature;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Submits `transaction` and waits for confirmation, resubmitting on an interval.
///
/// Returns [`Error::Rejected`] if the ledger refuses the transaction and
/// [`Error::Timeout`] if confirmation is not observed before `policy.deadline`.
/// Network errors during polling or resubmission are retried until then.
pub async fn submit_with_retry<R: LedgerRpc>(
    rpc: &R,
    transaction: &[u8],
    policy: &RetryPolicy,
) -> Result<Signature, Error> {
    let deadline = Instant::now() + policy.deadline;
    let mut interval = policy.interval;
    let mut attempts = 1u32;

    let signature = loop {
        match rpc.submit_transaction(transaction).await {
            Ok(signature) => break signature,
            Err(Error::Network(reason)) => {
                warn!(%reason, attempts, "Transaction submission failed");
            }
            Err(err) => return Err(err),
        }
        if !wait_before_retry(&mut interval, deadline, policy).await {
            return Err(Error::Timeout);
        }
        attempts += 1;
    };
    let signature_text = bs58::encode(signature.to_bytes()).into_string();
    debug!(signature = %signature_text, "Transaction submitted");

    loop {
        match rpc.transaction_status(&signature).await {
            Ok(TransactionStatus::Confirmed) => {
                info!(signature = %signature_text, attempts, "Transaction confirmed");
                return Ok(signature);
            }
            Ok(TransactionStatus::Failed(failure)) => {
                warn!(signature = %signature_text, %failure, "Transaction rejected");
                return Err(Error::Rejected(failure));
            }
            Ok(TransactionStatus::Pending) => {}
            Err(Error::Network(reason)) => {
                warn!(signature = %signature_text, %reason, "Status lookup failed");
            }
            Err(err) => return Err(err),
        }

        if !wait_before_retry(&mut interval, deadline, policy).await {
            warn!(signature = %signature_text, attempts, "Gave up waiting for confirmation");
            return Err(Error::Timeout);
        }

        attempts += 1;
        if let Err(err) = rpc.submit_transaction(transaction).await {
            debug!(signature = %signature_text, %err, "Resubmission failed");
        }
    }
}

/// Sleeps for the current interval, cut short at `deadline`, and backs off.
///
/// Returns `false` without sleeping once the deadline has passed.
async fn wait_before_retry(
    interval: &mut Duration,
    deadline: Instant,
    policy: &RetryPolicy,
) -> bool {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return false;
    }

    sleep((*interval).min(remaining)).await;
    *interval = next_interval(*interval, policy);
    true
}

fn next_interval(interval: Duration, policy: &RetryPolicy) -> Duration {
    interval
        .saturating_mul(policy.backoff.max(1))
        .min(policy.max_interval)
}
