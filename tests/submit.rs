mod common;

use common::MemoryLedger;
use quill::rpc::{TransactionFailure, TransactionStatus};
use quill::{Error, RetryPolicy, submit_with_retry};
use std::time::Duration;
use tokio::time::Instant;

fn transaction() -> Vec<u8> {
    let mut bytes = vec![1u8];
    bytes.extend_from_slice(&[9u8; 64]);
    bytes.extend_from_slice(&[0u8; 40]);
    bytes
}

#[tokio::test(start_paused = true)]
async fn test_resubmits_until_confirmed() {
    let ledger = MemoryLedger::default();
    ledger.script_statuses([Ok(TransactionStatus::Pending), Ok(TransactionStatus::Pending)]);

    let start = Instant::now();
    let signature = submit_with_retry(&ledger, &transaction(), &RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(signature.to_bytes(), [9u8; 64]);
    assert_eq!(ledger.submitted().len(), 3);
    // 2s, then 4s of backoff.
    assert_eq!(start.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_rejection_is_not_a_timeout() {
    let ledger = MemoryLedger::default();
    let failure = TransactionFailure::Program("custom program error: 0x1".to_string());
    ledger.script_statuses([
        Ok(TransactionStatus::Pending),
        Ok(TransactionStatus::Failed(failure.clone())),
    ]);

    let result = submit_with_retry(&ledger, &transaction(), &RetryPolicy::default()).await;

    assert_eq!(result, Err(Error::Rejected(failure)));
}

#[tokio::test(start_paused = true)]
async fn test_times_out_at_deadline() {
    let ledger = MemoryLedger::default();
    ledger.script_statuses((0..100).map(|_| Ok(TransactionStatus::Pending)));
    let policy = RetryPolicy::default();

    let start = Instant::now();
    let result = submit_with_retry(&ledger, &transaction(), &policy).await;

    assert_eq!(result, Err(Error::Timeout));
    // Waits of 2, 4 and then 8 seconds, the last one cut to 6s by the deadline.
    assert_eq!(ledger.submitted().len(), 10);
    assert_eq!(start.elapsed(), policy.deadline);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_at_deadline_is_observed() {
    let ledger = MemoryLedger::default();
    ledger.script_statuses((0..9).map(|_| Ok(TransactionStatus::Pending)));
    let policy = RetryPolicy::default();

    let start = Instant::now();
    let result = submit_with_retry(&ledger, &transaction(), &policy).await;

    assert!(result.is_ok());
    assert_eq!(start.elapsed(), policy.deadline);
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_are_retried() {
    let ledger = MemoryLedger::default();
    ledger.script_submit_errors([
        Error::Network("connection reset".to_string()),
        Error::Network("connection reset".to_string()),
    ]);
    ledger.script_statuses([
        Err(Error::Network("timeout".to_string())),
        Ok(TransactionStatus::Confirmed),
    ]);

    let result = submit_with_retry(&ledger, &transaction(), &RetryPolicy::default()).await;

    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_ledger_times_out() {
    let ledger = MemoryLedger::default();
    ledger.script_submit_errors((0..100).map(|_| Error::Network("unreachable".to_string())));
    let policy = RetryPolicy {
        deadline: Duration::from_secs(10),
        ..RetryPolicy::default()
    };

    let result = submit_with_retry(&ledger, &transaction(), &policy).await;

    assert_eq!(result, Err(Error::Timeout));
    assert!(ledger.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_propagate() {
    let ledger = MemoryLedger::default();
    ledger.script_submit_errors([Error::InvalidInput("malformed transaction".to_string())]);

    let result = submit_with_retry(&ledger, &transaction(), &RetryPolicy::default()).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
