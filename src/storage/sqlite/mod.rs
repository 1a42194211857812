//! Shared `SQLite` infrastructure for the role store.
//!
//! - [`connection`]: `Mutex<Connection>` lock acquisition and pragma setup
//! - [`schema`]: table definitions and row decoding
//! - [`metrics`]: per-operation metrics helpers

mod connection;
mod metrics;
mod schema;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::{record_operation_metrics, status_label};
pub(crate) use schema::decode_action;
pub use schema::{decode_conditions, encode_conditions, initialize_schema};
