pub mod errors;
pub mod faces;
pub mod runtime;
