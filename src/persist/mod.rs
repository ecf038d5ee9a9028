pub mod persistence;
pub mod restore;
