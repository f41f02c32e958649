//! Logger setup for binaries embedding the sprite batch.
//!
//! The library itself only emits through the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};
