use {
    super::{Confirmation, Creation, Error, Node, Receipt, instrumentation::LoggingLayer},
    crate::config::Account,
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, TxHash, U256},
        providers::{
            DynProvider,
            PendingTransactionBuilder,
            PendingTransactionError,
            Provider,
            ProviderBuilder,
            WatchTxError,
        },
        rpc::{
            client::{ClientBuilder, RpcClient},
            types::TransactionRequest,
        },
    },
    std::time::Duration,
    url::Url,
};

/// An Ethereum node reached over JSON-RPC via HTTP.
///
/// With a private key the transaction is signed locally and submitted raw,
/// otherwise it is sent unsigned and the node signs it with its first
/// unlocked account.
#[derive(Clone)]
pub struct Ethereum {
    provider: DynProvider,
    signer: Option<Address>,
}

impl Ethereum {
    /// Creates the client. No request is made until the first call.
    pub fn new(url: &Url, account: &Account) -> Self {
        let rpc = ClientBuilder::default()
            .layer(LoggingLayer)
            .http(url.clone());
        Self::with_client(rpc, account)
    }

    /// Creates the node on top of an already configured RPC client.
    pub fn with_client(rpc: RpcClient, account: &Account) -> Self {
        match account {
            Account::PrivateKey(signer) => Self {
                provider: ProviderBuilder::new()
                    .wallet(EthereumWallet::new(signer.clone()))
                    .connect_client(rpc)
                    .erased(),
                signer: Some(signer.address()),
            },
            Account::NodeDefault => Self {
                provider: ProviderBuilder::new().connect_client(rpc).erased(),
                signer: None,
            },
        }
    }

    fn request(creation: &Creation) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(creation.from)
            .with_deploy_code(creation.code.clone())
    }
}

#[async_trait::async_trait]
impl Node for Ethereum {
    async fn chain_id(&self) -> Result<u64, Error> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn deployer(&self) -> Result<Address, Error> {
        if let Some(signer) = self.signer {
            return Ok(signer);
        }
        let accounts = self.provider.get_accounts().await?;
        accounts.first().copied().ok_or(Error::NoDefaultAccount)
    }

    async fn balance(&self, account: Address) -> Result<U256, Error> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn creation_cost(&self, creation: &Creation) -> Result<U256, Error> {
        let gas = self.provider.estimate_gas(Self::request(creation)).await?;
        // Same max fee the gas filler puts on the submitted transaction.
        let fees = self.provider.estimate_eip1559_fees().await?;
        tracing::debug!(gas, max_fee_per_gas = fees.max_fee_per_gas, "estimated creation cost");
        Ok(U256::from(gas) * U256::from(fees.max_fee_per_gas))
    }

    async fn submit(&self, creation: &Creation) -> Result<TxHash, Error> {
        let pending = self
            .provider
            .send_transaction(Self::request(creation))
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(&self, tx: TxHash, params: &Confirmation) -> Result<Receipt, Error> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx)
            .with_required_confirmations(params.confirmations)
            .with_timeout(Some(params.timeout))
            .get_receipt()
            .await
            .map_err(|err| watch_error(tx, params.timeout, err))?;

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: ReceiptResponse::status(&receipt),
            contract_address: receipt.contract_address,
        })
    }

    async fn code_size(&self, address: Address) -> Result<usize, Error> {
        Ok(self.provider.get_code_at(address).await?.len())
    }
}

fn watch_error(tx: TxHash, timeout: Duration, err: PendingTransactionError) -> Error {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => Error::Timeout { tx, timeout },
        PendingTransactionError::TransportError(err) => err.into(),
        err => Error::Watch {
            tx,
            reason: err.to_string(),
        },
    }
}
