//! The configuration of a deployment run, resolved from command line
//! arguments, environment variables, an optional config file and defaults.

use {
    crate::{arguments::Arguments, node::Confirmation},
    alloy::{primitives::Bytes, signers::local::PrivateKeySigner},
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        str::FromStr,
    },
    url::Url,
};

pub mod file;

pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_ARTIFACT: &str =
    "artifacts/contracts/CertificateRegistry.sol/CertificateRegistry.json";
pub const DEFAULT_OUTPUT: &str = "../client/src/contract-config.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub node_url: Url,
    pub account: Account,
    /// Chain ID the node has to report, if any.
    pub chain_id: Option<u64>,
    pub artifact: PathBuf,
    pub output: PathBuf,
    pub include_abi: bool,
    pub constructor_args: Bytes,
    pub confirmation: Confirmation,
}

/// The identity signing the contract creation.
#[derive(Debug, Clone)]
pub enum Account {
    /// Sign locally with this key.
    PrivateKey(PrivateKeySigner),
    /// Let the node sign with its first unlocked account.
    NodeDefault,
}

impl Config {
    pub async fn resolve(args: &Arguments) -> Result<Self, Error> {
        let file = match &args.config {
            Some(path) => file::load(path).await?,
            None => file::Config::default(),
        };
        Self::merge(args, file)
    }

    /// Combines arguments and file configuration. Arguments win.
    fn merge(args: &Arguments, file: file::Config) -> Result<Self, Error> {
        let node_url = match args.node_url.clone().or(file.node_url) {
            Some(url) => url,
            None => Url::parse(DEFAULT_NODE_URL)?,
        };

        let account = match (args.private_key.as_ref(), file.account.as_ref()) {
            (Some(key), _) | (None, Some(file::Account::PrivateKey(key))) => {
                Account::PrivateKey(parse_private_key(key)?)
            }
            (None, Some(file::Account::NodeDefault) | None) => Account::NodeDefault,
        };

        let constructor_args = match args
            .constructor_args
            .as_ref()
            .or(file.constructor_args.as_ref())
        {
            Some(hex) => Bytes::from_str(hex).map_err(|_| Error::ConstructorArgs)?,
            None => Bytes::new(),
        };

        let defaults = Confirmation::default();
        let confirmation = Confirmation {
            confirmations: args
                .confirmations
                .or(file.confirmations)
                .unwrap_or(defaults.confirmations),
            timeout: args
                .confirmation_timeout
                .or(file.confirmation_timeout)
                .unwrap_or(defaults.timeout),
        };
        if confirmation.confirmations == 0 {
            return Err(Error::ZeroConfirmations);
        }

        Ok(Self {
            node_url,
            account,
            chain_id: args.chain_id.or(file.chain_id),
            artifact: args
                .artifact
                .clone()
                .or(file.artifact)
                .unwrap_or_else(|| DEFAULT_ARTIFACT.into()),
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.into()),
            include_abi: args.include_abi.or(file.include_abi).unwrap_or(true),
            constructor_args,
            confirmation,
        })
    }
}

fn parse_private_key(key: &str) -> Result<PrivateKeySigner, Error> {
    PrivateKeySigner::from_str(key.trim()).map_err(|_| Error::PrivateKey)
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "node_url: {}", self.node_url)?;
        match &self.account {
            Account::PrivateKey(signer) => {
                writeln!(f, "account: {} (private key)", signer.address())?
            }
            Account::NodeDefault => writeln!(f, "account: node default")?,
        }
        crate::arguments::display_option(f, "chain_id", &self.chain_id)?;
        writeln!(f, "artifact: {}", self.artifact.display())?;
        writeln!(f, "output: {}", self.output.display())?;
        writeln!(f, "include_abi: {}", self.include_abi)?;
        writeln!(f, "constructor_args: {}", self.constructor_args)?;
        writeln!(f, "confirmations: {}", self.confirmation.confirmations)?;
        writeln!(
            f,
            "confirmation_timeout: {}",
            humantime::format_duration(self.confirmation.timeout)
        )?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML syntax error while reading {path:?}")]
    Syntax { path: PathBuf },
    #[error("invalid node URL: {0}")]
    NodeUrl(#[from] url::ParseError),
    #[error("private key is not a valid hex encoded secp256k1 key")]
    PrivateKey,
    #[error("constructor arguments are not valid hex")]
    ConstructorArgs,
    #[error("at least one confirmation is required")]
    ZeroConfirmations,
}
