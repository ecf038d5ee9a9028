pub mod prompt;
pub mod scheduler;
pub mod tracker;
pub mod tracker_model;
