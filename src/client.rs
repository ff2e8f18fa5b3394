//! High-level operations for applications.
//!
//! [`Client`] wires address derivation, the account codec, instruction
//! builders, encryption and submission together. It never keeps state of its
//! own between calls; per-session state lives in a [`SessionCache`] owned by
//! the caller.

use crate::account::{AccountState, GroupThread, MessageKind, Profile, Thread};
use crate::address::{
    group_index_address, group_message_address, group_thread_address, message_address,
    profile_address, subscription_address, thread_address,
};
use crate::cache::{LocalCache, SessionCache};
use crate::group::{self, GroupEdit};
use crate::instruction::{
    CreateGroupThreadArgs, CreateProfileArgs, Instruction, SendMessageArgs, SetUserProfileArgs,
    create_group_index, create_group_thread, create_profile, create_subscription, create_thread,
    delete_message, send_message, set_user_profile,
};
use crate::rpc::{LedgerRpc, TransactionFailure};
use crate::session::DirectSession;
use crate::submit::submit_with_retry;
use crate::sync::{Conversation, LoggedMessage, SyncDriver};
use crate::transaction::Transaction;
use crate::{ClientConfig, Error, Keypair, Pubkey};
use ed25519_dalek::Signature;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of submitting an instruction that creates an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Signature),
    /// The account existed already; nothing was changed.
    AlreadyExists,
}

/// Instructions for one direct message, ready to sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedMessage {
    /// Creates the thread first when this is the pair's first message.
    pub instructions: Vec<Instruction>,
    pub message_index: u32,
    pub message_address: Pubkey,
}

pub struct Client<R: LedgerRpc> {
    rpc: R,
    config: ClientConfig,
}

impl<R: LedgerRpc> Client<R> {
    pub fn new(rpc: R, config: ClientConfig) -> Self {
        Self { rpc, config }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn program_id(&self) -> &Pubkey {
        &self.config.program_id
    }

    /// Fetches and decodes the account at `address`, `None` if absent.
    pub async fn fetch_optional<T: AccountState>(&self, address: &Pubkey) -> Result<Option<T>, Error> {
        self.rpc
            .get_account(address)
            .await?
            .map(|data| T::decode(&data))
            .transpose()
    }

    /// Fetches and decodes the account at `address`.
    pub async fn fetch<T: AccountState>(&self, address: &Pubkey) -> Result<T, Error> {
        self.fetch_optional(address)
            .await?
            .ok_or(Error::NotFound(*address))
    }

    pub async fn profile(&self, owner: &Pubkey) -> Result<Option<Profile>, Error> {
        let (address, _) = profile_address(self.program_id(), owner)?;
        self.fetch_optional(&address).await
    }

    /// Signs `instructions`, submits them and waits for confirmation.
    pub async fn send(
        &self,
        payer: &Keypair,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<Signature, Error> {
        let blockhash = self.rpc.latest_blockhash().await?;
        let transaction = Transaction::new_signed(payer, instructions, signers, blockhash)?;
        let bytes = transaction.serialize()?;
        debug!(
            instructions = instructions.len(),
            size = bytes.len(),
            "Submitting transaction"
        );

        submit_with_retry(&self.rpc, &bytes, &self.config.retry).await
    }

    /// Submits an account-creating instruction unless the account at `address` exists.
    ///
    /// A creation that loses a race with another client is reported as
    /// [`CreateOutcome::AlreadyExists`], not as a rejection.
    pub async fn submit_create(
        &self,
        payer: &Keypair,
        address: &Pubkey,
        instruction: Instruction,
    ) -> Result<CreateOutcome, Error> {
        if self.rpc.get_account(address).await?.is_some() {
            debug!(%address, "Account exists, skipping creation");
            return Ok(CreateOutcome::AlreadyExists);
        }

        match self.send(payer, &[instruction], &[]).await {
            Ok(signature) => {
                info!(%address, "Account created");
                Ok(CreateOutcome::Created(signature))
            }
            Err(Error::Rejected(TransactionFailure::AccountInUse)) => {
                info!(%address, "Account was created concurrently");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(err),
        }
    }

    /// Creates the direct thread between `payer` and `peer`.
    pub async fn create_thread(&self, payer: &Keypair, peer: &Pubkey) -> Result<CreateOutcome, Error> {
        let me = payer.pubkey();
        let (thread, _) = thread_address(self.program_id(), &me, peer)?;
        let instruction = create_thread(self.program_id(), &me, peer, &me)?;
        self.submit_create(payer, &thread, instruction).await
    }

    /// Encrypts `plaintext` as the next message from `sender` to `receiver`.
    ///
    /// The message index is the thread's current count; a missing thread is
    /// created in the same transaction.
    pub async fn prepare_direct_message(
        &self,
        sender: &Keypair,
        receiver: &Pubkey,
        plaintext: &[u8],
        replies_to: Option<Pubkey>,
    ) -> Result<PreparedMessage, Error> {
        if plaintext.is_empty() {
            return Err(Error::invalid("Message cannot be empty"));
        }
        let session = DirectSession::new(self.program_id(), sender, receiver)?;
        let me = sender.pubkey();

        let mut instructions = Vec::with_capacity(2);
        let message_index = match self
            .fetch_optional::<Thread>(session.thread_address())
            .await?
        {
            Some(thread) => thread.msg_count,
            None => {
                debug!(thread = %session.thread_address(), "First message, creating thread");
                instructions.push(create_thread(self.program_id(), &me, receiver, &me)?);
                0
            }
        };

        let (message_address, ciphertext) = session.encrypt(message_index, plaintext)?;
        instructions.push(send_message(
            self.program_id(),
            &me,
            receiver,
            session.thread_address(),
            message_index,
            &SendMessageArgs {
                kind: MessageKind::Encrypted,
                message: ciphertext,
                replies_to,
            },
        )?);

        Ok(PreparedMessage {
            instructions,
            message_index,
            message_address,
        })
    }

    /// Prepares and sends the next message from `sender` to `receiver`.
    ///
    /// If the peer created the thread between preparing and confirming, the
    /// message is prepared again against the existing thread and resent once.
    pub async fn send_direct_message(
        &self,
        sender: &Keypair,
        receiver: &Pubkey,
        plaintext: &[u8],
        replies_to: Option<Pubkey>,
    ) -> Result<Signature, Error> {
        let prepared = self
            .prepare_direct_message(sender, receiver, plaintext, replies_to)
            .await?;
        let creates_thread = prepared.instructions.len() > 1;

        match self.send(sender, &prepared.instructions, &[]).await {
            Err(Error::Rejected(TransactionFailure::AccountInUse)) if creates_thread => {
                info!(%receiver, "Thread was created concurrently, resending");
                let prepared = self
                    .prepare_direct_message(sender, receiver, plaintext, replies_to)
                    .await?;
                self.send(sender, &prepared.instructions, &[]).await
            }
            result => result,
        }
    }

    pub async fn delete_direct_message<C: LocalCache>(
        &self,
        sender: &Keypair,
        receiver: &Pubkey,
        message_index: u32,
        cache: &mut SessionCache<C>,
    ) -> Result<Signature, Error> {
        let me = sender.pubkey();
        let (address, _) = message_address(self.program_id(), message_index, &me, receiver)?;
        let instruction = delete_message(self.program_id(), &me, receiver, message_index)?;

        let signature = self.send(sender, &[instruction], &[]).await?;
        cache.forget_decrypted(&address)?;
        Ok(signature)
    }

    /// Instructions that apply `settings` to `owner`'s profile, creating it
    /// first when absent.
    pub async fn prepare_profile_edit(
        &self,
        owner: &Pubkey,
        settings: &SetUserProfileArgs,
    ) -> Result<Vec<Instruction>, Error> {
        let mut instructions = Vec::with_capacity(2);
        if self.profile(owner).await?.is_none() {
            debug!(%owner, "Profile missing, creating it");
            instructions.push(create_profile(
                self.program_id(),
                owner,
                &CreateProfileArgs {
                    picture_hash: String::new(),
                    display_domain_name: String::new(),
                    bio: String::new(),
                    lamports_per_message: settings.lamports_per_message,
                },
            )?);
        }
        instructions.push(set_user_profile(self.program_id(), owner, settings)?);

        Ok(instructions)
    }

    pub async fn edit_profile(
        &self,
        owner: &Keypair,
        settings: &SetUserProfileArgs,
    ) -> Result<Signature, Error> {
        let instructions = self.prepare_profile_edit(&owner.pubkey(), settings).await?;
        self.send(owner, &instructions, &[]).await
    }

    /// Creates a group and registers the owner as its first member.
    pub async fn create_group(
        &self,
        owner: &Keypair,
        args: &CreateGroupThreadArgs,
    ) -> Result<CreateOutcome, Error> {
        let (group_address, _) =
            group_thread_address(self.program_id(), &args.group_name, &args.owner)?;
        let instruction = create_group_thread(self.program_id(), &owner.pubkey(), args)?;

        let outcome = self.submit_create(owner, &group_address, instruction).await?;
        self.join_group(owner, &group_address).await?;
        Ok(outcome)
    }

    /// Creates `member`'s membership marker for the group at `group_address`.
    pub async fn join_group(
        &self,
        member: &Keypair,
        group_address: &Pubkey,
    ) -> Result<CreateOutcome, Error> {
        let group: GroupThread = self.fetch(group_address).await?;
        let me = member.pubkey();
        let (index_address, _) =
            group_index_address(self.program_id(), &group.group_name, &me, group_address)?;
        let instruction =
            create_group_index(self.program_id(), &me, &group.group_name, group_address, &me)?;

        self.submit_create(member, &index_address, instruction).await
    }

    /// Fetches the group, applies `edit` on top of it and submits the result.
    pub async fn edit_group(
        &self,
        owner: &Keypair,
        group_address: &Pubkey,
        edit: &GroupEdit,
    ) -> Result<Signature, Error> {
        let current: GroupThread = self.fetch(group_address).await?;
        let instruction = group::edit_group(
            self.program_id(),
            group_address,
            &current,
            &owner.pubkey(),
            edit,
        )?;
        self.send(owner, &[instruction], &[]).await
    }

    pub async fn add_group_admin(
        &self,
        owner: &Keypair,
        group_address: &Pubkey,
        admin: &Pubkey,
    ) -> Result<Signature, Error> {
        let current: GroupThread = self.fetch(group_address).await?;
        let instruction = group::add_admin(
            self.program_id(),
            group_address,
            &current,
            &owner.pubkey(),
            admin,
        )?;
        self.send(owner, &[instruction], &[]).await
    }

    pub async fn remove_group_admin(
        &self,
        owner: &Keypair,
        group_address: &Pubkey,
        admin: &Pubkey,
    ) -> Result<Signature, Error> {
        let current: GroupThread = self.fetch(group_address).await?;
        let instruction = group::remove_admin(
            self.program_id(),
            group_address,
            &current,
            &owner.pubkey(),
            admin,
        )?;
        self.send(owner, &[instruction], &[]).await
    }

    /// Builds the next post to the group at `group_address` from its current record.
    pub async fn prepare_group_message(
        &self,
        sender: &Pubkey,
        group_address: &Pubkey,
        kind: MessageKind,
        message: Vec<u8>,
        replies_to: Option<Pubkey>,
    ) -> Result<Instruction, Error> {
        let current: GroupThread = self.fetch(group_address).await?;
        group::prepare_group_message(
            self.program_id(),
            group_address,
            &current,
            sender,
            kind,
            message,
            replies_to,
        )
    }

    pub async fn send_group_message(
        &self,
        sender: &Keypair,
        group_address: &Pubkey,
        kind: MessageKind,
        message: Vec<u8>,
        replies_to: Option<Pubkey>,
    ) -> Result<Signature, Error> {
        let instruction = self
            .prepare_group_message(&sender.pubkey(), group_address, kind, message, replies_to)
            .await?;
        self.send(sender, &[instruction], &[]).await
    }

    pub async fn delete_group_message<C: LocalCache>(
        &self,
        sender: &Keypair,
        group_address: &Pubkey,
        message_index: u32,
        cache: &mut SessionCache<C>,
    ) -> Result<Signature, Error> {
        let current: GroupThread = self.fetch(group_address).await?;
        let instruction = group::prepare_group_delete(
            self.program_id(),
            group_address,
            &current,
            &sender.pubkey(),
            message_index,
        )?;
        let (address, _) = group_message_address(self.program_id(), message_index, group_address)?;

        let signature = self.send(sender, &[instruction], &[]).await?;
        cache.forget_decrypted(&address)?;
        Ok(signature)
    }

    pub async fn subscribe_to(
        &self,
        subscriber: &Keypair,
        subscribed_to: &Pubkey,
    ) -> Result<CreateOutcome, Error> {
        let me = subscriber.pubkey();
        let (address, _) = subscription_address(self.program_id(), &me, subscribed_to)?;
        let instruction = create_subscription(self.program_id(), &me, subscribed_to)?;
        self.submit_create(subscriber, &address, instruction).await
    }

    /// Synchronizer for the direct thread between `me` and `peer`.
    pub fn direct_sync<C: LocalCache>(
        &self,
        me: &Pubkey,
        peer: &Pubkey,
        cache: &SessionCache<C>,
        cancel: CancellationToken,
    ) -> Result<SyncDriver<'_, R>, Error> {
        let conversation = Conversation::direct(self.program_id(), me, peer)?;
        SyncDriver::new(&self.rpc, &self.config, conversation, cache, cancel)
    }

    /// Synchronizer for the group at `group_address`.
    pub fn group_sync<C: LocalCache>(
        &self,
        group_address: &Pubkey,
        cache: &SessionCache<C>,
        cancel: CancellationToken,
    ) -> Result<SyncDriver<'_, R>, Error> {
        let conversation = Conversation::group(*group_address);
        SyncDriver::new(&self.rpc, &self.config, conversation, cache, cancel)
    }
}

/// Returns the readable body of a synchronized direct message.
///
/// Encrypted bodies are decrypted once and then served from `cache`.
pub fn read_direct_message<C: LocalCache>(
    session: &DirectSession,
    logged: &LoggedMessage,
    cache: &mut SessionCache<C>,
) -> Result<Vec<u8>, Error> {
    if !logged.message.kind.is_encrypted() {
        return Ok(logged.message.msg.clone());
    }
    if let Some(plaintext) = cache.decrypted(&logged.address)? {
        return Ok(plaintext);
    }

    let plaintext = session.decrypt_at(&logged.address, &logged.message.msg)?;
    cache.store_decrypted(&logged.address, &plaintext)?;
    Ok(plaintext)
}
