pub mod object_store;
pub mod persistence;
pub mod provider;
