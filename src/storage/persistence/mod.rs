//! Role store implementations.

mod memory;
mod sqlite;

pub use memory::MemoryRoleStore;
pub use sqlite::SqliteRoleStore;
