//! Error taxonomy shared across the bond SDK.

use core::fmt;

use thiserror::Error;

/// Result type alias that carries [`Error`] failures.
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet-reported code for a request the user declined to sign (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Numeric codes attached to every [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// User-entered quantity is malformed or out of range.
    InvalidAmount = 1001,
    /// No deployment is registered for the network id.
    UnknownNetwork = 1101,
    /// The bond identifier is not deployed on the network.
    UnknownBond = 1102,
    /// The network has no donation drive configured.
    DonationUnavailable = 1103,
    /// The address registry document is malformed.
    Registry = 1104,
    /// A read needed for pricing failed.
    QuoteUnavailable = 2001,
    /// A read needed for a user position failed.
    PositionUnavailable = 2002,
    /// The signer declined the request.
    UserRejected = 3001,
    /// The transaction was executed and reverted, or the node refused it.
    TransactionReverted = 3002,
    /// EVM transport failure.
    Rpc = 4001,
    /// ABI return data could not be decoded.
    Decode = 4002,
}

impl ErrorCode {
    /// Numeric representation associated with the error.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Failure reported by a node or wallet, with every field the RPC layer exposed.
///
/// Wallets and nodes nest the useful part of an error at different depths:
/// a decoded revert reason, a `data.message` string, or only the top-level
/// message. All three are kept so callers can pick the most specific one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RpcFailure {
    /// JSON-RPC or wallet error code, when one was returned.
    pub code: Option<i64>,
    /// Top-level error message.
    pub message: String,
    /// `data.message` of a nested error payload.
    pub data_message: Option<String>,
    /// Decoded `Error(string)` revert reason.
    pub revert_reason: Option<String>,
}

impl RpcFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data_message(mut self, message: impl Into<String>) -> Self {
        self.data_message = Some(message.into());
        self
    }

    pub fn with_revert_reason(mut self, reason: impl Into<String>) -> Self {
        self.revert_reason = Some(reason.into());
        self
    }

    /// Revert reason, then nested data message, then the generic message.
    pub fn most_specific_message(&self) -> &str {
        self.revert_reason
            .as_deref()
            .or(self.data_message.as_deref())
            .unwrap_or(&self.message)
    }

    /// True when the wallet reported that the user declined to sign.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == Some(USER_REJECTED_CODE) {
            return true;
        }
        let message = self.message.to_ascii_lowercase();
        message.contains("action_rejected")
            || message.contains("user rejected")
            || message.contains("user denied")
    }
}

/// Unified error type for the SDK.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("no deployment registered for network {0}")]
    UnknownNetwork(u64),
    #[error("bond {bond} is not deployed on network {network}")]
    UnknownBond { bond: String, network: u64 },
    #[error("no donation drive registered for network {0}")]
    DonationUnavailable(u64),
    #[error("address registry: {0}")]
    Registry(String),
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(#[source] Box<Error>),
    #[error("position unavailable: {0}")]
    PositionUnavailable(#[source] Box<Error>),
    #[error("user rejected the request")]
    UserRejected(#[source] RpcFailure),
    #[error("transaction reverted: {reason}")]
    TransactionReverted {
        reason: String,
        #[source]
        cause: Option<RpcFailure>,
    },
    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcFailure),
    #[error("decode {0}")]
    Decode(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAmount(_) => ErrorCode::InvalidAmount,
            Self::UnknownNetwork(_) => ErrorCode::UnknownNetwork,
            Self::UnknownBond { .. } => ErrorCode::UnknownBond,
            Self::DonationUnavailable(_) => ErrorCode::DonationUnavailable,
            Self::Registry(_) => ErrorCode::Registry,
            Self::QuoteUnavailable(_) => ErrorCode::QuoteUnavailable,
            Self::PositionUnavailable(_) => ErrorCode::PositionUnavailable,
            Self::UserRejected(_) => ErrorCode::UserRejected,
            Self::TransactionReverted { .. } => ErrorCode::TransactionReverted,
            Self::Rpc(_) => ErrorCode::Rpc,
            Self::Decode(_) => ErrorCode::Decode,
        }
    }

    pub(crate) fn quote_unavailable(err: Error) -> Self {
        match err {
            already @ Self::QuoteUnavailable(_) => already,
            other => Self::QuoteUnavailable(Box::new(other)),
        }
    }

    pub(crate) fn position_unavailable(err: Error) -> Self {
        match err {
            already @ Self::PositionUnavailable(_) => already,
            other => Self::PositionUnavailable(Box::new(other)),
        }
    }
}
