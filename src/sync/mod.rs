//! Incremental synchronization of a conversation's append-only message log.
//!
//! [`Synchronizer`] is a pure state machine: it consumes [`SyncEvent`]s and
//! answers with the [`FetchPlan`] to execute next, if any. It never touches
//! the network; [`SyncDriver`] executes plans against a [`LedgerRpc`].
//!
//! [`LedgerRpc`]: crate::rpc::LedgerRpc

mod discovery;
pub use discovery::*;
mod driver;
pub use driver::*;

use crate::account::{AccountState, GroupThread, Message, Thread};
use crate::address::{group_message_address, message_address, thread_address};
use crate::{Error, Pubkey};
use tracing::{debug, info, warn};

/// A direct thread or a group, identified by its summary account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conversation {
    Direct {
        thread: Pubkey,
        user_1: Pubkey,
        user_2: Pubkey,
    },
    Group {
        group: Pubkey,
    },
}

impl Conversation {
    pub fn direct(program_id: &Pubkey, a: &Pubkey, b: &Pubkey) -> Result<Self, Error> {
        let (thread, _) = thread_address(program_id, a, b)?;
        Ok(Self::Direct {
            thread,
            user_1: *a,
            user_2: *b,
        })
    }

    pub fn group(group: Pubkey) -> Self {
        Self::Group { group }
    }

    /// Address of the summary account holding the message count.
    pub fn key(&self) -> &Pubkey {
        match self {
            Self::Direct { thread, .. } => thread,
            Self::Group { group } => group,
        }
    }

    pub fn message_address(&self, program_id: &Pubkey, index: u32) -> Result<Pubkey, Error> {
        let (address, _) = match self {
            Self::Direct { user_1, user_2, .. } => {
                message_address(program_id, index, user_1, user_2)?
            }
            Self::Group { group } => group_message_address(program_id, index, group)?,
        };
        Ok(address)
    }

    /// Reads the authoritative message count out of the summary account.
    pub fn message_count(&self, summary: &[u8]) -> Result<u32, Error> {
        match self {
            Self::Direct { .. } => Ok(Thread::decode(summary)?.msg_count),
            Self::Group { .. } => Ok(GroupThread::decode(summary)?.msg_count),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No summary observed yet.
    Uninitialized,
    /// A fetch plan is in flight.
    Loading,
    Synced,
    /// The last fetch failed; the next observation retries from the last-seen count.
    Error,
}

/// One fetched message slot; `data` is `None` when the account is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedMessage {
    pub index: u32,
    pub address: Pubkey,
    pub data: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// The summary account reports `message_count` messages, via poll or push.
    SummaryObserved { message_count: u32 },
    FetchCompleted {
        generation: u64,
        batch: Vec<FetchedMessage>,
    },
    FetchFailed { generation: u64, error: Error },
    /// The owning scope ended; anything still in flight must be discarded.
    Cancel,
}

/// Message slots to fetch, tagged with the generation their results must carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub generation: u64,
    pub addresses: Vec<(u32, Pubkey)>,
    /// Count the last-seen cache advances to once the plan lands.
    pub target_count: u32,
}

/// A message applied to the local log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedMessage {
    pub index: u32,
    pub address: Pubkey,
    pub message: Message,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    generation: u64,
    target_count: u32,
}

pub struct Synchronizer {
    program_id: Pubkey,
    conversation: Conversation,
    window: u32,
    state: SyncState,
    last_seen: Option<u32>,
    generation: u64,
    in_flight: Option<InFlight>,
    /// Highest count observed while loading, replayed once the batch lands.
    pending: Option<u32>,
    log: Vec<LoggedMessage>,
}

impl Synchronizer {
    /// `last_seen` is the persisted count from a previous session, if any.
    pub fn new(
        program_id: Pubkey,
        conversation: Conversation,
        window: u32,
        last_seen: Option<u32>,
    ) -> Self {
        Self {
            program_id,
            conversation,
            window,
            state: SyncState::Uninitialized,
            last_seen,
            generation: 0,
            in_flight: None,
            pending: None,
            log: Vec::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Count every message below which has been applied or skipped.
    pub fn last_seen(&self) -> Option<u32> {
        self.last_seen
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Messages applied so far, in ascending index order.
    pub fn log(&self) -> &[LoggedMessage] {
        &self.log
    }

    pub fn handle(&mut self, event: SyncEvent) -> Result<Option<FetchPlan>, Error> {
        match event {
            SyncEvent::SummaryObserved { message_count } => self.observe(message_count),
            SyncEvent::FetchCompleted { generation, batch } => self.complete(generation, batch),
            SyncEvent::FetchFailed { generation, error } => {
                if !self.is_current(generation) {
                    debug!(generation, "Discarding stale fetch failure");
                    return Ok(None);
                }
                warn!(key = %self.conversation.key(), %error, "Message fetch failed");
                self.in_flight = None;
                self.pending = None;
                self.state = SyncState::Error;
                Ok(None)
            }
            SyncEvent::Cancel => {
                // Outstanding results now carry a stale generation.
                self.generation += 1;
                self.in_flight = None;
                self.pending = None;
                if self.state == SyncState::Loading {
                    self.state = if self.last_seen.is_some() {
                        SyncState::Synced
                    } else {
                        SyncState::Uninitialized
                    };
                }
                Ok(None)
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.in_flight
            .is_some_and(|in_flight| in_flight.generation == generation)
    }

    fn observe(&mut self, message_count: u32) -> Result<Option<FetchPlan>, Error> {
        if let Some(in_flight) = self.in_flight {
            if message_count > in_flight.target_count {
                self.pending = self.pending.max(Some(message_count));
            }
            return Ok(None);
        }
        let message_count = self
            .pending
            .take()
            .map_or(message_count, |pending| pending.max(message_count));

        if self.last_seen.is_some_and(|last_seen| message_count <= last_seen) {
            if self.state != SyncState::Error {
                self.state = SyncState::Synced;
            }
            return Ok(None);
        }

        let oldest = message_count.saturating_sub(self.window);
        let start = self.last_seen.map_or(oldest, |last_seen| last_seen.max(oldest));
        if start >= message_count {
            self.last_seen = Some(message_count);
            self.state = SyncState::Synced;
            return Ok(None);
        }

        let addresses = match (start..message_count)
            .map(|index| {
                self.conversation
                    .message_address(&self.program_id, index)
                    .map(|address| (index, address))
            })
            .collect::<Result<Vec<_>, Error>>()
        {
            Ok(addresses) => addresses,
            Err(err) => {
                self.state = SyncState::Error;
                return Err(err);
            }
        };

        self.generation += 1;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            target_count: message_count,
        });
        self.state = SyncState::Loading;
        debug!(
            key = %self.conversation.key(),
            generation = self.generation,
            start,
            end = message_count,
            "Planned message fetch"
        );

        Ok(Some(FetchPlan {
            generation: self.generation,
            addresses,
            target_count: message_count,
        }))
    }

    fn complete(
        &mut self,
        generation: u64,
        mut batch: Vec<FetchedMessage>,
    ) -> Result<Option<FetchPlan>, Error> {
        let Some(in_flight) = self.in_flight.filter(|in_flight| in_flight.generation == generation)
        else {
            debug!(generation, current = self.generation, "Discarding stale fetch result");
            return Ok(None);
        };
        self.in_flight = None;

        // Fetches may complete out of order.
        batch.sort_by_key(|fetched| fetched.index);

        let mut decoded = Vec::with_capacity(batch.len());
        let mut corrupt = Vec::new();
        for fetched in batch {
            let Some(data) = fetched.data else {
                debug!(index = fetched.index, "Message not finalized or deleted, skipping");
                continue;
            };
            match Message::decode(&data) {
                Ok(message) => decoded.push(LoggedMessage {
                    index: fetched.index,
                    address: fetched.address,
                    message,
                }),
                Err(err) => {
                    warn!(
                        key = %self.conversation.key(),
                        index = fetched.index,
                        %err,
                        "Undecodable message"
                    );
                    corrupt.push(fetched.index);
                }
            }
        }

        let newest = self.log.last().map(|logged| logged.index);
        let before = self.log.len();
        self.log.extend(
            decoded
                .into_iter()
                .filter(|logged| newest.is_none_or(|newest| logged.index > newest)),
        );
        self.last_seen = self.last_seen.max(Some(in_flight.target_count));
        self.state = SyncState::Synced;
        info!(
            key = %self.conversation.key(),
            applied = self.log.len() - before,
            count = in_flight.target_count,
            "Conversation synchronized"
        );

        if !corrupt.is_empty() {
            // A coalesced observation stays pending for the next one.
            return Err(Error::Decode(format!(
                "Undecodable messages at indexes {corrupt:?} in {}",
                self.conversation.key()
            )));
        }

        match self.pending.take() {
            Some(message_count) => self.observe(message_count),
            None => Ok(None),
        }
    }
}
