pub mod error;
pub mod status;
pub mod validation;
