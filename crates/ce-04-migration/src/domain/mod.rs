pub mod config;
pub mod errors;
pub mod journal;
pub mod plan;
pub mod result;
pub mod step;

pub use config::MigrationConfig;
pub use errors::{ArtifactError, MigrationError};
pub use journal::{HolderReplication, ReplicationJournal};
pub use plan::MigrationPlan;
pub use result::{MigrationResult, Ratio};
pub use step::MigrationStep;
