pub mod inbound;

pub use inbound::MigrationApi;
