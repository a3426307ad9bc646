//! Access to the Ethereum node the contract gets deployed to.
//!
//! The [`Node`] trait is the only seam between the deployment procedure and
//! the network so the procedure can be tested against a mocked node.

use {
    alloy::{
        primitives::{Address, Bytes, TxHash, U256},
        transports::{RpcError, TransportError},
    },
    std::time::Duration,
};

mod ethereum;
mod instrumentation;

pub use self::ethereum::Ethereum;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Node: Send + Sync {
    /// The chain ID reported by the node.
    async fn chain_id(&self) -> Result<u64, Error>;

    /// The account that signs the creation transaction.
    async fn deployer(&self) -> Result<Address, Error>;

    async fn balance(&self, account: Address) -> Result<U256, Error>;

    /// Upper bound of the fee the creation transaction is expected to cost
    /// at the current gas price.
    async fn creation_cost(&self, creation: &Creation) -> Result<U256, Error>;

    /// Signs and submits the creation transaction. Returns as soon as the
    /// node accepted it.
    async fn submit(&self, creation: &Creation) -> Result<TxHash, Error>;

    /// Waits until the transaction is included and buried under the requested
    /// number of confirmations.
    async fn confirm(&self, tx: TxHash, params: &Confirmation) -> Result<Receipt, Error>;

    /// Size of the code deployed at `address`.
    async fn code_size(&self, address: Address) -> Result<usize, Error>;
}

/// A contract creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub from: Address,
    /// Creation bytecode followed by the encoded constructor arguments.
    pub code: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Number of blocks (including the one with the transaction) that have to
    /// be mined before the transaction counts as confirmed.
    pub confirmations: u64,
    pub timeout: Duration,
}

impl Default for Confirmation {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout: Duration::from_secs(60),
        }
    }
}

/// The parts of a transaction receipt the deployment cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Whether the transaction executed without reverting.
    pub success: bool,
    pub contract_address: Option<Address>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node is unreachable: {0}")]
    Unreachable(#[source] TransportError),
    #[error("node returned an error: {0}")]
    Rpc(#[source] TransportError),
    #[error("node rejected the account for lack of funds: {0}")]
    InsufficientFunds(#[source] TransportError),
    #[error("node does not manage any account that could sign the deployment")]
    NoDefaultAccount,
    #[error("transaction {tx} was not confirmed within {timeout:?}")]
    Timeout { tx: TxHash, timeout: Duration },
    #[error("failed to watch transaction {tx}: {reason}")]
    Watch { tx: TxHash, reason: String },
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        // Geth, Anvil and Hardhat all word the rejection this way.
        let lacks_funds = err
            .as_error_resp()
            .is_some_and(|payload| payload.message.contains("insufficient funds"));
        match err {
            // Anything that is not a response from the node means we never
            // talked to it.
            RpcError::Transport(_) => Self::Unreachable(err),
            _ if lacks_funds => Self::InsufficientFunds(err),
            _ => Self::Rpc(err),
        }
    }
}
