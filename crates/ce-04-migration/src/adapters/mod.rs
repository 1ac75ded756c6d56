pub mod artifact;

pub use artifact::{load_artifact, resolve_artifact_path};
