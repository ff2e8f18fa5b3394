use crate::Pubkey;
use crate::rpc::TransactionFailure;

/// Errors that can occur while talking to the messaging program.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// The account does not exist (yet).
    ///
    /// Callers treat this as a control-flow signal, e.g. "create the thread first".
    #[error("Account not found: {0}")]
    NotFound(Pubkey),

    /// Bytes were present but did not match the expected tag or layout.
    #[error("Failed to decode account data: {0}")]
    Decode(String),

    /// Authenticated decryption failed or a key could not be converted.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// The ledger RPC could not be reached or answered with garbage.
    #[error("Network error: {0}")]
    Network(String),

    /// Confirmation was not observed before the retry deadline.
    #[error("Timed out waiting for transaction confirmation")]
    Timeout,

    /// The ledger executed the transaction and rejected it.
    #[error("Transaction rejected: {0}")]
    Rejected(TransactionFailure),

    /// The caller supplied a malformed key, name, amount or payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The owning scope was cancelled before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// Serialization or deserialization of a local record failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<crypto_secretbox::aead::Error> for Error {
    fn from(_: crypto_secretbox::aead::Error) -> Self {
        Self::Crypto("Authenticated decryption failed".to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
