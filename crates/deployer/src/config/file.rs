//! The optional TOML deployment configuration file.
//!
//! ```toml
//! node-url = "http://127.0.0.1:8545"
//! chain-id = 1337
//! artifact = "artifacts/contracts/CertificateRegistry.sol/CertificateRegistry.json"
//! output = "../client/src/contract-config.json"
//! include-abi = true
//! confirmations = 1
//! confirmation-timeout = "1m"
//!
//! [account]
//! private-key = "0x..."
//! ```

use {
    super::Error,
    serde::Deserialize,
    std::{fmt, path::Path, time::Duration},
    url::Url,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub node_url: Option<Url>,

    /// Either `account = "node-default"` or a table with a `private-key`.
    pub account: Option<Account>,

    pub chain_id: Option<u64>,

    pub artifact: Option<std::path::PathBuf>,

    pub output: Option<std::path::PathBuf>,

    pub include_abi: Option<bool>,

    /// Hex encoded constructor arguments.
    pub constructor_args: Option<String>,

    pub confirmations: Option<u64>,

    #[serde(default, with = "humantime_serde")]
    pub confirmation_timeout: Option<Duration>,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Account {
    PrivateKey(String),
    NodeDefault,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(_) => f.write_str("PrivateKey(SECRET)"),
            Self::NodeDefault => f.write_str("NodeDefault"),
        }
    }
}

/// Load the deployment configuration from a TOML file.
pub async fn load(path: &Path) -> Result<Config, Error> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::ReadFile {
            path: path.to_owned(),
            source,
        })?;
    parse(&data).map_err(|_| Error::Syntax {
        path: path.to_owned(),
    })
}

// Not exposing the detailed error because it could leak private keys.
fn parse(data: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(data)
}
