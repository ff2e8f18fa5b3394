use super::{Conversation, FetchPlan, FetchedMessage, SyncEvent, Synchronizer};
use crate::cache::{LocalCache, SessionCache};
use crate::rpc::{AccountNotification, LedgerRpc};
use crate::{ClientConfig, Error, Pubkey};
use futures::future::try_join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs a [`Synchronizer`] against the ledger.
///
/// Every state mutation is preceded by a check of the cancellation token, so
/// results that arrive after the owning scope ended are dropped.
pub struct SyncDriver<'a, R: LedgerRpc> {
    rpc: &'a R,
    synchronizer: Synchronizer,
    batch_limit: usize,
    cancel: CancellationToken,
}

impl<'a, R: LedgerRpc> SyncDriver<'a, R> {
    /// Resumes from the last-seen count persisted in `cache`.
    pub fn new<C: LocalCache>(
        rpc: &'a R,
        config: &ClientConfig,
        conversation: Conversation,
        cache: &SessionCache<C>,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let last_seen = cache.last_count(conversation.key())?;
        let synchronizer = Synchronizer::new(
            config.program_id,
            conversation,
            config.max_sync_window,
            last_seen,
        );

        Ok(Self {
            rpc,
            synchronizer,
            batch_limit: config.rpc_batch_limit.max(1),
            cancel,
        })
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ends synchronization; in-flight results are discarded.
    pub fn cancel(&mut self) -> Result<(), Error> {
        self.cancel.cancel();
        self.synchronizer.handle(SyncEvent::Cancel)?;
        Ok(())
    }

    fn key(&self) -> Pubkey {
        *self.synchronizer.conversation().key()
    }

    /// Fetches the summary account and synchronizes up to its message count.
    pub async fn poll<C: LocalCache>(&mut self, cache: &mut SessionCache<C>) -> Result<(), Error> {
        let key = self.key();
        let summary = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            summary = self.rpc.get_account(&key) => summary?,
        };
        let summary = summary.ok_or(Error::NotFound(key))?;

        self.apply_summary(&summary, cache).await
    }

    /// Applies a pushed change of the summary account.
    pub async fn apply_notification<C: LocalCache>(
        &mut self,
        notification: &AccountNotification,
        cache: &mut SessionCache<C>,
    ) -> Result<(), Error> {
        if notification.address != self.key() {
            debug!(address = %notification.address, "Ignoring notification for another account");
            return Ok(());
        }
        let Some(summary) = &notification.data else {
            warn!(key = %notification.address, "Summary account was closed");
            return Ok(());
        };

        self.apply_summary(summary, cache).await
    }

    async fn apply_summary<C: LocalCache>(
        &mut self,
        summary: &[u8],
        cache: &mut SessionCache<C>,
    ) -> Result<(), Error> {
        let message_count = self.synchronizer.conversation().message_count(summary)?;

        let mut next = self.handle(SyncEvent::SummaryObserved { message_count }, cache)?;
        while let Some(plan) = next {
            next = match self.fetch(&plan).await {
                Ok(batch) => self.handle(
                    SyncEvent::FetchCompleted {
                        generation: plan.generation,
                        batch,
                    },
                    cache,
                )?,
                Err(error) => {
                    self.handle(
                        SyncEvent::FetchFailed {
                            generation: plan.generation,
                            error: error.clone(),
                        },
                        cache,
                    )?;
                    return Err(error);
                }
            };
        }

        Ok(())
    }

    fn handle<C: LocalCache>(
        &mut self,
        event: SyncEvent,
        cache: &mut SessionCache<C>,
    ) -> Result<Option<FetchPlan>, Error> {
        if self.cancel.is_cancelled() {
            self.synchronizer.handle(SyncEvent::Cancel)?;
            return Err(Error::Cancelled);
        }

        // Progress made before a decode error is still persisted.
        let plan = self.synchronizer.handle(event);
        if let Some(count) = self.synchronizer.last_seen() {
            cache.advance_last_count(&self.key(), count)?;
        }
        plan
    }

    /// Fetches every slot of `plan`, `batch_limit` addresses per request,
    /// with all requests in flight at once.
    async fn fetch(&self, plan: &FetchPlan) -> Result<Vec<FetchedMessage>, Error> {
        debug!(
            generation = plan.generation,
            slots = plan.addresses.len(),
            "Fetching messages"
        );

        let requests = plan.addresses.chunks(self.batch_limit).map(|chunk| async move {
            let addresses: Vec<Pubkey> = chunk.iter().map(|(_, address)| *address).collect();
            let accounts = self.rpc.get_accounts(&addresses).await?;
            if accounts.len() != chunk.len() {
                return Err(Error::Network(format!(
                    "Requested {} accounts, received {}",
                    chunk.len(),
                    accounts.len()
                )));
            }

            Ok::<_, Error>(
                chunk
                    .iter()
                    .zip(accounts)
                    .map(|(&(index, address), data)| FetchedMessage {
                        index,
                        address,
                        data,
                    })
                    .collect::<Vec<_>>(),
            )
        });

        let chunks = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            chunks = try_join_all(requests) => chunks?,
        };

        let mut batch: Vec<FetchedMessage> = chunks.into_iter().flatten().collect();
        batch.sort_by_key(|fetched| fetched.index);
        Ok(batch)
    }

    /// Synchronizes once, then follows push notifications until cancelled.
    ///
    /// The subscription is always released before returning.
    pub async fn run<C: LocalCache>(&mut self, cache: &mut SessionCache<C>) -> Result<(), Error> {
        let key = self.key();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscription = self.rpc.subscribe_account(&key, sender).await?;
        info!(%key, "Following conversation");

        let result = self.follow(&mut receiver, cache).await;

        if let Err(err) = self.rpc.unsubscribe(subscription).await {
            warn!(%key, %err, "Failed to unsubscribe");
        }
        self.synchronizer.handle(SyncEvent::Cancel)?;
        info!(%key, "Stopped following conversation");

        result
    }

    async fn follow<C: LocalCache>(
        &mut self,
        receiver: &mut mpsc::UnboundedReceiver<AccountNotification>,
        cache: &mut SessionCache<C>,
    ) -> Result<(), Error> {
        match self.poll(cache).await {
            Ok(()) | Err(Error::NotFound(_)) => {}
            Err(Error::Cancelled) => return Ok(()),
            Err(err) => warn!(key = %self.key(), %err, "Initial synchronization failed"),
        }

        let cancel = self.cancel.clone();
        loop {
            let notification = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                notification = receiver.recv() => notification,
            };
            let Some(notification) = notification else {
                debug!(key = %self.key(), "Notification stream closed");
                return Ok(());
            };

            match self.apply_notification(&notification, cache).await {
                Ok(()) => {}
                Err(Error::Cancelled) => return Ok(()),
                // The next notification retries from the last-seen count.
                Err(err) => warn!(key = %self.key(), %err, "Synchronization failed"),
            }
        }
    }
}
