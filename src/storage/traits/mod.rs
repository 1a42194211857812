//! Storage backend traits.

mod role_store;

pub use role_store::RoleStore;
