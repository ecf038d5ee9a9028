pub mod field_classifier;
pub mod form_classifier;
pub mod form_model;
