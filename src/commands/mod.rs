//! CLI command implementations.
//!
//! Each submodule implements one mend subcommand, keeping the core logic
//! apart from IO so it can be tested.

pub(crate) mod clean;
pub(crate) mod init;
pub(crate) mod run;
pub(crate) mod status;
