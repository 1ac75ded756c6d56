use shared_types::{Address, ContractArtifact};

use super::errors::{ArtifactError, MigrationError};

/// Settings shared by every migration.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    /// Owner passed to the constructor of every new instance.
    pub admin: Address,
    /// Creation code of the gated token.
    pub artifact: ContractArtifact,
}

impl MigrationConfig {
    pub fn new(admin: Address, artifact: ContractArtifact) -> Self {
        Self { admin, artifact }
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.admin.is_zero() {
            return Err(MigrationError::InvalidAdmin);
        }
        validate_bytecode(&self.artifact)?;
        Ok(())
    }
}

pub(crate) fn validate_bytecode(artifact: &ContractArtifact) -> Result<(), ArtifactError> {
    if artifact.bytecode.len() <= 2 || !artifact.bytecode.starts_with("0x") {
        return Err(ArtifactError::MissingBytecode);
    }
    Ok(())
}
