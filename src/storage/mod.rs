pub mod entry;
pub mod file_store;
pub mod messaging;
pub mod store;
pub mod tiered;
