//! Loading of compiled contract artifacts.
//!
//! Both the Hardhat layout (`"bytecode": "0x..."`) and the solc/Foundry layout
//! (`"bytecode": { "object": "0x..." }`) are understood.

use {
    alloy::{
        json_abi::{ContractObject, JsonAbi},
        primitives::Bytes,
    },
    std::path::Path,
};

/// A compiled contract: its interface description and creation bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    abi: JsonAbi,
    bytecode: Bytes,
}

impl Artifact {
    /// Reads and validates the artifact stored at `path`.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let ContractObject { abi, bytecode, .. } = serde_json::from_str(json)?;
        let bytecode = bytecode
            .filter(|code| !code.is_empty())
            .ok_or(Error::MissingBytecode)?;
        if abi.is_none() {
            tracing::warn!("artifact does not contain an ABI, using an empty one");
        }
        Ok(Self {
            abi: abi.unwrap_or_default(),
            bytecode,
        })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// The init code of a contract creation transaction: the creation
    /// bytecode followed by the ABI encoded constructor arguments.
    pub fn creation_code(&self, constructor_args: &[u8]) -> Bytes {
        if constructor_args.is_empty() {
            return self.bytecode.clone();
        }
        [self.bytecode.as_ref(), constructor_args].concat().into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("artifact has no creation bytecode, is it an abstract contract or interface?")]
    MissingBytecode,
}
