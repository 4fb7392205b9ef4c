//! Library entry for sprig-cli used by integration tests.

pub mod commands;
pub mod site;

pub use commands::{decorate, probe};
