pub mod cli;
pub mod commands;
pub mod doctor;
pub mod errors;
pub mod faces;
pub mod output;
