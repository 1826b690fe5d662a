use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod rpc;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet provider unreachable: {0}")]
    Unavailable(String),
    #[error("wallet request was rejected by the user")]
    Rejected,
    #[error("wallet exposed no accounts")]
    NoAccounts,
    #[error("wallet rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Account access offered by the wallet extension. Signing stays with the
/// wallet and is not part of this seam.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompts the user if needed and returns the active account.
    async fn request_accounts(&self) -> Result<String, WalletError>;

    /// Stream of the active account; `None` once the wallet exposes none.
    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<String>>;
}
