//! Deploys a compiled contract and records where it ended up.
//!
//! The procedure is strictly sequential: load the artifact, check the chain
//! and the deploying account, submit the creation transaction, wait for it to
//! be confirmed and only then write the result file. Any failure aborts the
//! run without touching the result file.

use {
    crate::{
        artifact::{self, Artifact},
        config::Config,
        node::{self, Creation, Node},
        output::{self, DeploymentResult},
    },
    alloy::primitives::{Address, TxHash, U256},
    std::{fmt, path::PathBuf},
};

pub async fn run<N>(node: &N, config: &Config) -> Result<DeploymentResult, Error>
where
    N: Node + ?Sized,
{
    let artifact = Artifact::load(&config.artifact)
        .await
        .map_err(|source| Error::Artifact {
            path: config.artifact.clone(),
            source,
        })?;

    let chain_id = node.chain_id().await.map_err(Error::Connection)?;
    tracing::info!(chain_id, url = %config.node_url, "connected to node");
    if let Some(expected) = config.chain_id {
        if expected != chain_id {
            return Err(Error::ChainMismatch {
                expected,
                actual: chain_id,
            });
        }
    }

    let deployer = node.deployer().await.map_err(Error::Identity)?;
    tracing::info!(?deployer, "deploying from");

    let creation = Creation {
        from: deployer,
        code: artifact.creation_code(&config.constructor_args),
    };
    check_funds(node, &creation).await?;

    let tx = node.submit(&creation).await.map_err(Error::Submission)?;
    tracing::info!(?tx, "submitted contract creation");

    let receipt = node
        .confirm(tx, &config.confirmation)
        .await
        .map_err(Error::Confirmation)?;
    if !receipt.success {
        return Err(Error::Reverted { tx });
    }
    let address = receipt
        .contract_address
        .ok_or(Error::NoContractAddress { tx })?;
    if node.code_size(address).await.map_err(Error::Confirmation)? == 0 {
        return Err(Error::NoCode { address });
    }
    tracing::info!(
        ?address,
        tx = ?receipt.tx_hash,
        block = ?receipt.block_number,
        gas_used = receipt.gas_used,
        "contract deployed"
    );

    let result = DeploymentResult {
        address,
        chain_id,
        abi: config.include_abi.then(|| artifact.abi().clone()),
    };
    result.write(&config.output).map_err(Error::Output)?;
    tracing::info!(path = %config.output.display(), "saved deployment result");
    Ok(result)
}

/// Makes sure the deploying account can pay for the creation before anything
/// gets submitted.
async fn check_funds<N>(node: &N, creation: &Creation) -> Result<(), Error>
where
    N: Node + ?Sized,
{
    let account = creation.from;
    let balance = node.balance(account).await.map_err(Error::Identity)?;
    if balance.is_zero() {
        return Err(Error::Unfunded { account });
    }
    let cost = node
        .creation_cost(creation)
        .await
        .map_err(Error::Estimation)?;
    if balance < cost {
        return Err(Error::InsufficientFunds {
            account,
            balance,
            cost,
        });
    }
    tracing::debug!(%balance, %cost, "deployer can pay for the creation");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        source: artifact::Error,
    },
    #[error("failed to connect to node: {0}")]
    Connection(#[source] node::Error),
    #[error("node is on chain {actual} but chain {expected} was expected")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("failed to resolve deploying account: {0}")]
    Identity(#[source] node::Error),
    #[error("deploying account {account} has no funds")]
    Unfunded { account: Address },
    #[error("deploying account {account} has {balance} wei but the creation costs {cost} wei")]
    InsufficientFunds {
        account: Address,
        balance: U256,
        cost: U256,
    },
    #[error("failed to estimate creation cost: {0}")]
    Estimation(#[source] node::Error),
    #[error("node did not accept the creation transaction: {0}")]
    Submission(#[source] node::Error),
    #[error("creation transaction was not confirmed: {0}")]
    Confirmation(#[source] node::Error),
    #[error("creation transaction {tx} reverted")]
    Reverted { tx: TxHash },
    #[error("receipt of transaction {tx} has no contract address")]
    NoContractAddress { tx: TxHash },
    #[error("no code at {address} after deployment")]
    NoCode { address: Address },
    #[error("failed to save deployment result: {0}")]
    Output(#[source] output::Error),
}

/// The broad category of a failed deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Bad artifact or configuration.
    Input,
    Connectivity,
    /// The deploying identity is missing, invalid or cannot pay.
    Signing,
    /// Submission or confirmation of the creation transaction failed.
    Transaction,
    Filesystem,
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Artifact { .. } | Self::ChainMismatch { .. } => Kind::Input,
            Self::Connection(_) => Kind::Connectivity,
            Self::Identity(err)
            | Self::Estimation(err)
            | Self::Submission(err)
            | Self::Confirmation(err)
                if matches!(err, node::Error::Unreachable(_)) =>
            {
                Kind::Connectivity
            }
            Self::Identity(err) | Self::Estimation(err) | Self::Submission(err)
                if matches!(err, node::Error::InsufficientFunds(_)) =>
            {
                Kind::Signing
            }
            Self::Identity(_) | Self::Unfunded { .. } | Self::InsufficientFunds { .. } => {
                Kind::Signing
            }
            Self::Estimation(_)
            | Self::Submission(_)
            | Self::Confirmation(_)
            | Self::Reverted { .. }
            | Self::NoContractAddress { .. }
            | Self::NoCode { .. } => Kind::Transaction,
            Self::Output(_) => Kind::Filesystem,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Connectivity => "connectivity",
            Self::Signing => "signing",
            Self::Transaction => "transaction",
            Self::Filesystem => "filesystem",
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            config::Account,
            node::{Confirmation, MockNode, Receipt},
        },
        alloy::{
            primitives::{Bytes, address, b256, hex},
            transports::TransportErrorKind,
        },
        mockall::predicate::eq,
        std::{path::Path, time::Duration},
    };

    const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const TX: TxHash = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
    const ONE_ETH: u64 = 1_000_000_000_000_000_000;

    const ARTIFACT: &str = r#"{
        "contractName": "CertificateRegistry",
        "abi": [{
            "type": "function",
            "name": "issue",
            "inputs": [{ "name": "hash", "type": "bytes32", "internalType": "bytes32" }],
            "outputs": [],
            "stateMutability": "nonpayable"
        }],
        "bytecode": "0x6080604052"
    }"#;

    fn config(dir: &Path) -> Config {
        let artifact = dir.join("CertificateRegistry.json");
        std::fs::write(&artifact, ARTIFACT).unwrap();
        Config {
            node_url: "http://127.0.0.1:8545".parse().unwrap(),
            account: Account::NodeDefault,
            chain_id: None,
            artifact,
            output: dir.join("contract-config.json"),
            include_abi: true,
            constructor_args: Bytes::new(),
            confirmation: Confirmation {
                confirmations: 1,
                timeout: Duration::from_secs(5),
            },
        }
    }

    fn receipt(contract_address: Address) -> Receipt {
        Receipt {
            tx_hash: TX,
            block_number: Some(1),
            gas_used: 100_000,
            success: true,
            contract_address: Some(contract_address),
        }
    }

    fn unreachable() -> node::Error {
        node::Error::from(TransportErrorKind::custom_str("connection refused"))
    }

    /// A node on chain 1337 with a funded default account. Expectations for
    /// the submission and everything after it are left to the test.
    fn funded_node() -> MockNode {
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer().returning(|| Ok(DEPLOYER));
        node.expect_balance()
            .with(eq(DEPLOYER))
            .returning(|_| Ok(U256::from(ONE_ETH)));
        node.expect_creation_cost()
            .returning(|_| Ok(U256::from(1_000_000u64)));
        node
    }

    /// A node that accepts and confirms the deployment at `contract`.
    fn healthy_node(contract: Address) -> MockNode {
        let mut node = funded_node();
        node.expect_submit().times(1).returning(|_| Ok(TX));
        node.expect_confirm()
            .withf(|tx, _| *tx == TX)
            .returning(move |_, _| Ok(receipt(contract)));
        node.expect_code_size()
            .with(eq(contract))
            .returning(|_| Ok(42));
        node
    }

    #[tokio::test]
    async fn deploys_and_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer().returning(|| Ok(DEPLOYER));
        node.expect_balance().returning(|_| Ok(U256::from(ONE_ETH)));
        node.expect_creation_cost()
            .withf(|creation| {
                creation.from == DEPLOYER && creation.code.as_ref() == hex!("6080604052")
            })
            .returning(|_| Ok(U256::from(1_000_000u64)));
        node.expect_submit().times(1).returning(|_| Ok(TX));
        node.expect_confirm()
            .withf(|tx, params| *tx == TX && params.confirmations == 1)
            .returning(|_, _| Ok(receipt(CONTRACT)));
        node.expect_code_size().returning(|_| Ok(42));

        let result = run(&node, &config).await.unwrap();

        assert_eq!(result.address, CONTRACT);
        assert_eq!(result.chain_id, 1337);
        let written = DeploymentResult::read(&config.output).unwrap();
        assert_eq!(written, result);
        assert!(written.abi.unwrap().function("issue").is_some());
    }

    #[tokio::test]
    async fn leaves_out_abi_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            include_abi: false,
            ..config(dir.path())
        };

        let result = run(&healthy_node(CONTRACT), &config).await.unwrap();

        assert_eq!(result.abi, None);
        let json = std::fs::read_to_string(&config.output).unwrap();
        assert!(!json.contains("abi"));
    }

    #[tokio::test]
    async fn appends_constructor_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            constructor_args: Bytes::from(hex!("2a").to_vec()),
            ..config(dir.path())
        };
        let mut node = funded_node();
        node.expect_submit()
            .withf(|creation| creation.code.as_ref() == hex!("60806040522a"))
            .times(1)
            .returning(|_| Ok(TX));
        node.expect_confirm()
            .returning(|_, _| Ok(receipt(CONTRACT)));
        node.expect_code_size().returning(|_| Ok(42));

        run(&node, &config).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_node_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.output, "previous").unwrap();
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Err(unreachable()));
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert_eq!(err.kind(), Kind::Connectivity);
        assert_eq!(std::fs::read_to_string(&config.output).unwrap(), "previous");
    }

    #[tokio::test]
    async fn chain_mismatch_aborts_before_submission() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            chain_id: Some(1),
            ..config(dir.path())
        };
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ChainMismatch {
                expected: 1,
                actual: 1337
            }
        ));
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn unfunded_account_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer().returning(|| Ok(DEPLOYER));
        node.expect_balance().returning(|_| Ok(U256::ZERO));
        node.expect_creation_cost().never();
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(err, Error::Unfunded { account } if account == DEPLOYER));
        assert_eq!(err.kind(), Kind::Signing);
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn underfunded_account_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer().returning(|| Ok(DEPLOYER));
        node.expect_balance().returning(|_| Ok(U256::from(10)));
        node.expect_creation_cost().returning(|_| Ok(U256::from(11)));
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(err.kind(), Kind::Signing);
    }

    #[tokio::test]
    async fn node_without_accounts_is_a_signing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer()
            .returning(|| Err(node::Error::NoDefaultAccount));
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert_eq!(err.kind(), Kind::Signing);
    }

    #[tokio::test]
    async fn reverted_creation_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.output, "previous").unwrap();
        let mut node = funded_node();
        node.expect_submit().returning(|_| Ok(TX));
        node.expect_confirm().returning(|_, _| {
            Ok(Receipt {
                success: false,
                ..receipt(CONTRACT)
            })
        });
        node.expect_code_size().never();

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(err, Error::Reverted { tx } if tx == TX));
        assert_eq!(err.kind(), Kind::Transaction);
        assert_eq!(std::fs::read_to_string(&config.output).unwrap(), "previous");
    }

    #[tokio::test]
    async fn confirmation_timeout_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = funded_node();
        node.expect_submit().returning(|_| Ok(TX));
        node.expect_confirm().returning(|tx, params| {
            Err(node::Error::Timeout {
                tx,
                timeout: params.timeout,
            })
        });

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Confirmation(node::Error::Timeout { .. })
        ));
        assert_eq!(err.kind(), Kind::Transaction);
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn missing_code_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = funded_node();
        node.expect_submit().returning(|_| Ok(TX));
        node.expect_confirm()
            .returning(|_, _| Ok(receipt(CONTRACT)));
        node.expect_code_size().returning(|_| Ok(0));

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(err, Error::NoCode { address } if address == CONTRACT));
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn invalid_artifact_never_contacts_node() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.artifact, r#"{ "abi": [], "bytecode": "0x" }"#).unwrap();
        let mut node = MockNode::new();
        node.expect_chain_id().never();

        let err = run(&node, &config).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Artifact {
                source: artifact::Error::MissingBytecode,
                ..
            }
        ));
        assert_eq!(err.kind(), Kind::Input);
    }

    #[tokio::test]
    async fn unwritable_output_is_a_filesystem_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output: dir.path().join("missing").join("contract-config.json"),
            ..config(dir.path())
        };

        let err = run(&healthy_node(CONTRACT), &config).await.unwrap_err();

        assert_eq!(err.kind(), Kind::Filesystem);
    }

    #[tokio::test]
    async fn last_deployment_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let second = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

        let first = run(&healthy_node(CONTRACT), &config).await.unwrap();
        let last = run(&healthy_node(second), &config).await.unwrap();

        assert_ne!(first.address, last.address);
        assert_eq!(
            DeploymentResult::read(&config.output).unwrap().address,
            second
        );
    }

    #[test]
    fn unreachable_node_is_a_connectivity_failure_at_any_step() {
        assert_eq!(Error::Submission(unreachable()).kind(), Kind::Connectivity);
        assert_eq!(Error::Identity(unreachable()).kind(), Kind::Connectivity);
        assert_eq!(
            Error::Submission(node::Error::Rpc(
                alloy::transports::TransportError::ErrorResp(
                    alloy::rpc::json_rpc::ErrorPayload::internal_error()
                )
            ))
            .kind(),
            Kind::Transaction
        );
    }

    #[test]
    fn node_rejecting_funds_is_a_signing_failure() {
        let broke = || {
            node::Error::from(alloy::transports::TransportError::ErrorResp(
                alloy::rpc::json_rpc::ErrorPayload {
                    code: -32000,
                    message: "insufficient funds for gas * price + value".into(),
                    data: None,
                },
            ))
        };
        assert_eq!(Error::Estimation(broke()).kind(), Kind::Signing);
        assert_eq!(Error::Submission(broke()).kind(), Kind::Signing);
        assert_eq!(Error::Estimation(unreachable()).kind(), Kind::Connectivity);
    }

    #[tokio::test]
    async fn node_rejecting_funds_on_estimation_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut node = MockNode::new();
        node.expect_chain_id().returning(|| Ok(1337));
        node.expect_deployer().returning(|| Ok(DEPLOYER));
        node.expect_balance().returning(|_| Ok(U256::from(1u64)));
        node.expect_creation_cost().returning(|_| {
            Err(node::Error::from(alloy::transports::TransportError::ErrorResp(
                alloy::rpc::json_rpc::ErrorPayload {
                    code: -32000,
                    message: "insufficient funds for transfer".into(),
                    data: None,
                },
            )))
        });
        node.expect_submit().never();

        let err = run(&node, &config).await.unwrap_err();

        assert_eq!(err.kind(), Kind::Signing);
        assert!(!config.output.exists());
    }
}
