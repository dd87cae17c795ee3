pub mod check;
pub mod cli;
pub mod config;
pub mod consul;
pub mod error;
pub mod metrics;

pub use check::{ConsulCheck, PollOutcome};
pub use config::{CheckConfig, Instance};
pub use error::{CheckError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
