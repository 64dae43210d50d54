//! Store access: connection profiles, the HTTP client, and schema discovery.

pub mod catalog;
pub mod client;
pub mod profile;

pub use catalog::{ColumnDescriptor, SchemaCatalog, TableDescriptor};
pub use client::{JsonRowCursor, StoreClient};
pub use profile::ConnectionProfile;
