mod archive;
pub mod cli;
mod commands;
pub mod config;
pub mod context;
mod error;
pub mod instance;
pub mod lifecycle;
pub mod paths;
pub mod preflight;
pub mod process;
pub mod provision;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use commands::run;
pub use error::{AppError, ErrorKind, Result};
