pub mod inbound;

pub use inbound::SnapshotApi;
