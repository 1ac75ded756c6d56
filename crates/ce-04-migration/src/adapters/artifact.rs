//! # Deployment Artifact Loader
//!
//! Reads a compiled contract artifact (`{"abi": [...], "bytecode": "0x..."}`)
//! from disk. Relative paths are tried from the working directory and up to
//! two parents, so the runtime can start from a nested directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared_types::ContractArtifact;

use crate::domain::config::validate_bytecode;
use crate::domain::errors::ArtifactError;

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    abi: serde_json::Value,
    #[serde(default)]
    bytecode: Option<String>,
}

/// First existing candidate for `path`.
pub fn resolve_artifact_path(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    [
        path.to_path_buf(),
        Path::new("..").join(path),
        Path::new("../..").join(path),
    ]
    .into_iter()
    .find(|candidate| candidate.exists())
}

/// Load and check an artifact.
///
/// ## Errors
///
/// - `NotFound`: no candidate path exists
/// - `Io` / `Parse`: unreadable or not JSON
/// - `MissingBytecode`: bytecode absent or not `0x`-prefixed
pub fn load_artifact(path: &Path) -> Result<ContractArtifact, ArtifactError> {
    let resolved = resolve_artifact_path(path).ok_or_else(|| ArtifactError::NotFound {
        path: path.display().to_string(),
    })?;
    let text = fs::read_to_string(&resolved).map_err(|e| ArtifactError::Io {
        path: resolved.display().to_string(),
        message: e.to_string(),
    })?;
    let raw: RawArtifact =
        serde_json::from_str(&text).map_err(|e| ArtifactError::Parse(e.to_string()))?;

    let artifact = ContractArtifact {
        abi: raw.abi,
        bytecode: raw.bytecode.ok_or(ArtifactError::MissingBytecode)?,
    };
    validate_bytecode(&artifact)?;

    tracing::debug!(path = %resolved.display(), "[ce-04] Loaded deployment artifact");
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_hardhat_style_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GatedToken.json");
        fs::write(
            &path,
            r#"{"contractName":"GatedToken","abi":[{"type":"function","name":"pause"}],"bytecode":"0x6080"}"#,
        )
        .unwrap();

        let artifact = load_artifact(&path).unwrap();
        assert_eq!(artifact.bytecode, "0x6080");
        assert_eq!(artifact.abi[0]["name"], "pause");
    }

    #[test]
    fn test_missing_bytecode_rejected() {
        let dir = tempdir().unwrap();
        for (name, body) in [
            ("none.json", r#"{"abi":[]}"#),
            ("empty.json", r#"{"abi":[],"bytecode":""}"#),
            ("bare.json", r#"{"abi":[],"bytecode":"6080"}"#),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            assert_eq!(load_artifact(&path), Err(ArtifactError::MissingBytecode));
        }
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_artifact(&missing),
            Err(ArtifactError::NotFound { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(matches!(load_artifact(&garbage), Err(ArtifactError::Parse(_))));
    }
}
