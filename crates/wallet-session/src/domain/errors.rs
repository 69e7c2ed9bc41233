//! # Domain Errors
//!
//! Error types for the wallet session.
//!
//! Every operation error can be turned into an [`ErrorRecord`] for the
//! session's `last_error` field.
//!
//! [`ErrorRecord`]: super::entities::ErrorRecord

use super::value_objects::ChainId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejected provider request, carrying the provider-defined code.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Provider error {code}: {message}")]
pub struct ProviderError {
    /// Provider-defined numeric code (EIP-1193 / JSON-RPC).
    pub code: i64,
    /// Human readable message.
    pub message: String,
}

impl ProviderError {
    /// User rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// Method or account not authorized by the user.
    pub const UNAUTHORIZED: i64 = 4100;
    /// Provider does not support the method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// Provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// Provider is not connected to the requested chain.
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    /// Chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL: i64 = -32603;

    /// Create a provider error.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The user declined the prompt.
    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request")
    }

    /// The wallet does not know the chain.
    pub fn unrecognized_chain(chain_id: ChainId) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{}\"", chain_id.to_hex()),
        )
    }

    /// Whether this is a user-declined prompt.
    pub fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// Whether the wallet reported an unknown chain.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}

/// Failure of a single typed request against a provider handle.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Provider rejected the request.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Provider answered with an unexpected shape.
    #[error("Malformed {method} response: {detail}")]
    MalformedResponse {
        /// Method whose response could not be decoded.
        method: &'static str,
        /// What was wrong.
        detail: String,
    },
}

impl RequestError {
    /// Provider code, if the provider rejected the request.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Provider(e) => Some(e.code),
            Self::MalformedResponse { .. } => None,
        }
    }
}

/// Provider factory failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No wallet could be opened.
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    /// The wallet refused the connection.
    #[error("Wallet refused connection: {0}")]
    Refused(ProviderError),
}

/// Connection errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Factory failed to open a provider.
    #[error("Provider factory failed: {0}")]
    Factory(#[from] FactoryError),

    /// Factory completed without a usable provider (e.g. selection dismissed).
    #[error("Provider factory returned no usable handle")]
    NoHandle,

    /// Accounts or network request failed.
    #[error("Connection request failed: {0}")]
    Request(#[from] RequestError),

    /// A newer connect or a disconnect happened while this one was pending.
    #[error("Connection superseded by a newer session generation")]
    Superseded,
}

impl ConnectError {
    /// Provider code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Factory(FactoryError::Refused(e)) => Some(e.code),
            Self::Request(e) => e.code(),
            _ => None,
        }
    }
}

/// Network switch errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SwitchError {
    /// Switch request rejected for a reason other than an unknown chain.
    #[error("Switch to chain {chain_id} rejected: {source}")]
    Rejected {
        /// Target chain.
        chain_id: ChainId,
        /// Underlying failure.
        source: RequestError,
    },

    /// Wallet did not know the chain and the add-chain fallback failed.
    #[error("Adding chain {chain_id} failed: {source}")]
    AddChainFailed {
        /// Target chain.
        chain_id: ChainId,
        /// Underlying failure.
        source: RequestError,
    },

    /// Wallet did not know the chain and no parameters are configured for it.
    #[error("No add-chain parameters configured for chain {0}")]
    UnknownChainParams(ChainId),

    /// Session moved to a new generation while the switch was pending.
    #[error("Switch superseded by a newer session generation")]
    Superseded,
}

impl SwitchError {
    /// Provider code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rejected { source, .. } | Self::AddChainFailed { source, .. } => source.code(),
            Self::UnknownChainParams(_) => Some(ProviderError::UNRECOGNIZED_CHAIN),
            Self::Superseded => None,
        }
    }
}

/// Signing errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SignError {
    /// No connected provider.
    #[error("Not connected")]
    NotConnected,

    /// Connected but the wallet exposed no account.
    #[error("No active account")]
    NoActiveAccount,

    /// Nothing to sign.
    #[error("No message to sign")]
    EmptyMessage,

    /// User declined the signature prompt.
    #[error("Signature declined: {0}")]
    Declined(ProviderError),

    /// Any other provider failure.
    #[error("Signing failed: {0}")]
    Request(RequestError),

    /// Session moved to a new generation while signing was pending.
    #[error("Signing superseded by a newer session generation")]
    Superseded,
}

impl SignError {
    /// Provider code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Declined(e) => Some(e.code),
            Self::Request(e) => e.code(),
            _ => None,
        }
    }
}

/// Verification errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No signed message/signature pair yet.
    #[error("Nothing has been signed")]
    NothingSigned,

    /// No account to compare the recovered signer against.
    #[error("No active account")]
    NoActiveAccount,

    /// No connected provider to ask for recovery.
    #[error("Not connected")]
    NotConnected,

    /// Recovery request failed.
    #[error("Signer recovery failed: {0}")]
    Request(RequestError),

    /// Account or signed pair changed, or the session moved to a new
    /// generation, while recovery was pending.
    #[error("Verification superseded by a newer session state")]
    Superseded,
}

impl VerifyError {
    /// Provider code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Request(e) => e.code(),
            _ => None,
        }
    }
}

/// Invalid chain id text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Invalid chain id: {0:?}")]
pub struct InvalidChainId(pub String);

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// File could not be parsed.
    #[error("Failed to parse chain table: {0}")]
    Parse(String),

    /// A chain entry is unusable.
    #[error("Invalid chain entry: {0}")]
    InvalidChain(String),
}
