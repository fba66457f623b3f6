//! Logging setup.
//!
//! The crate logs through the `log` facade only. `init_logging` installs
//! `env_logger` for hosts that do not bring their own logger.

mod init;

pub use init::{LoggingConfig, init_logging};
