//! The deployment result consumed by the front-end and its persistence.

use {
    alloy::{json_abi::JsonAbi, primitives::Address},
    serde::{Deserialize, Serialize, Serializer},
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
    tempfile::NamedTempFile,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    #[serde(serialize_with = "checksummed")]
    pub address: Address,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<JsonAbi>,
}

fn checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

impl DeploymentResult {
    /// Reads a previously written result.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes the result as pretty printed JSON to `path`, replacing any
    /// existing file.
    ///
    /// The content goes to a temporary file next to `path` first which is
    /// then renamed over it, so readers and failed runs never observe a
    /// partially written file.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        let io_err = |source| Error::Io {
            path: path.to_owned(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        if let Some(permissions) = target_permissions(path) {
            file.as_file().set_permissions(permissions).map_err(io_err)?;
        }
        file.persist(path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

/// Temporary files are only readable by their owner. Keep the permissions of
/// the file being replaced or fall back to the usual ones for new files.
fn target_permissions(path: &Path) -> Option<std::fs::Permissions> {
    if let Ok(metadata) = std::fs::metadata(path) {
        return Some(metadata.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(std::fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed deployment result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
