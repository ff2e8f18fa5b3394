//! Client-side protocol core for an account-based messaging program.
//!
//! All state lives in ledger accounts at deterministic addresses. This crate
//! derives those addresses, encodes and decodes the account layouts, builds
//! and submits instructions, encrypts direct messages end to end, and keeps a
//! local view of each conversation's message log in sync.

mod error;
pub use error::Error;

mod pubkey;
pub use pubkey::*;

mod identity;
pub use identity::Keypair;

mod types;
pub use types::*;

mod config;
pub use config::*;

mod session;
pub use session::*;

mod submit;
pub use submit::*;

mod client;
pub use client::*;

pub mod account;
pub mod address;
pub mod cache;
pub mod crypto;
pub mod group;
pub mod instruction;
pub mod media;
pub mod rpc;
pub mod sync;
pub mod transaction;

pub use ed25519_dalek::Signature;
